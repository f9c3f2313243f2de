use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::sync::Arc;

/// The direction of a fitness scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessDirection {
    /// Larger fitness values are more favourable.
    HigherIsBetter,
    /// Smaller fitness values are more favourable,
    /// e.g. when fitness counts errors or conflicts.
    LowerIsBetter,
}

/// Calculates and compares the fitness of states.
///
/// Fitness is measured in whole numbers for cheap comparison.
/// Implementors need only supply [`fitness`]; the comparisons
/// follow from the [`direction`] of the scale.
///
/// [`fitness`]: FitnessEvaluator::fitness
/// [`direction`]: FitnessEvaluator::direction
///
/// # Examples
/// ```
/// use agal::{FitnessDirection, FitnessEvaluator};
/// use std::cmp::Ordering;
///
/// struct Errors;
///
/// impl FitnessEvaluator<Vec<u8>> for Errors {
///     fn fitness(&self, state: &Vec<u8>) -> i64 {
///         state.iter().filter(|b| **b != 0).count() as i64
///     }
///
///     fn direction(&self) -> FitnessDirection {
///         FitnessDirection::LowerIsBetter
///     }
/// }
///
/// assert_eq!(Errors.compare(&vec![0, 0], &vec![0, 1]), Ordering::Greater);
/// ```
pub trait FitnessEvaluator<S>: Send + Sync {
    /// Returns the fitness of `state`.
    fn fitness(&self, state: &S) -> i64;

    /// Returns the direction of the fitness scale.
    fn direction(&self) -> FitnessDirection {
        FitnessDirection::HigherIsBetter
    }

    /// Orders two fitness values so that `Greater`
    /// means `first` is the more favourable.
    fn compare_fitness(&self, first: i64, second: i64) -> Ordering {
        match self.direction() {
            FitnessDirection::HigherIsBetter => first.cmp(&second),
            FitnessDirection::LowerIsBetter => second.cmp(&first),
        }
    }

    /// Orders two states so that `Greater` means
    /// `first` is the fitter.
    fn compare(&self, first: &S, second: &S) -> Ordering {
        self.compare_fitness(self.fitness(first), self.fitness(second))
    }
}

impl<S, F> FitnessEvaluator<S> for Arc<F>
where
    F: FitnessEvaluator<S> + ?Sized,
{
    fn fitness(&self, state: &S) -> i64 {
        (**self).fitness(state)
    }

    fn direction(&self) -> FitnessDirection {
        (**self).direction()
    }

    fn compare_fitness(&self, first: i64, second: i64) -> Ordering {
        (**self).compare_fitness(first, second)
    }

    fn compare(&self, first: &S, second: &S) -> Ordering {
        (**self).compare(first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity(FitnessDirection);

    impl FitnessEvaluator<i64> for Identity {
        fn fitness(&self, state: &i64) -> i64 {
            *state
        }

        fn direction(&self) -> FitnessDirection {
            self.0
        }
    }

    #[test]
    fn direction_flips_comparison() {
        let higher = Identity(FitnessDirection::HigherIsBetter);
        let lower = Identity(FitnessDirection::LowerIsBetter);

        assert_eq!(higher.compare(&3, &1), Ordering::Greater);
        assert_eq!(lower.compare(&3, &1), Ordering::Less);
        assert_eq!(lower.compare(&2, &2), Ordering::Equal);
    }

    #[test]
    fn shared_evaluator_delegates() {
        let shared: Arc<dyn FitnessEvaluator<i64>> =
            Arc::new(Identity(FitnessDirection::LowerIsBetter));

        assert_eq!(shared.direction(), FitnessDirection::LowerIsBetter);
        assert_eq!(shared.compare(&1, &5), Ordering::Greater);
    }
}

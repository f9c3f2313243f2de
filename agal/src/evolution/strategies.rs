use crate::errors::ConfigError;
use crate::fitness::FitnessEvaluator;
use crate::populations::Population;

use rand::Rng;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Implements the details of a particular problem's
/// state model: how states come to be and how they
/// combine.
///
/// Both methods are called once per breeding step by
/// every worker, so they should run in constant time
/// with a small constant.
pub trait StateManager<S>: Send + Sync {
    /// Generates a random problem state.
    fn randomize(&self) -> S;

    /// Combines parts of two parent states
    /// into a new child state.
    fn reproduce(&self, mother: &S, father: &S) -> S;
}

/// Decides how often, and how, states are mutated.
pub trait Mutator<S>: Send + Sync {
    /// Returns how many times `state` should be mutated.
    fn mutate_count(&self, state: &S) -> usize;

    /// Applies a single mutation to `state`.
    fn mutate(&self, state: &mut S);
}

/// Picks parents for breeding from a population.
pub trait Selector<S>: Send + Sync {
    /// Pushes the selected parents onto `parents`.
    /// Pushes nothing if the population is empty.
    fn select_parents(&self, population: &dyn Population<S>, parents: &mut Vec<Arc<S>>);
}

/// A mutator which applies its mutation once
/// with a fixed probability.
///
/// # Examples
/// ```
/// use agal::evolution::{Mutator, RateMutator};
///
/// let mutator = RateMutator::new(1.0, |v: &mut Vec<u8>| v.push(0)).unwrap();
/// let mut state = vec![];
/// for _ in 0..mutator.mutate_count(&state) {
///     mutator.mutate(&mut state);
/// }
/// assert_eq!(state, [0]);
///
/// assert!(RateMutator::new(1.5, |_: &mut Vec<u8>| {}).is_err());
/// ```
pub struct RateMutator<F> {
    rate: f64,
    mutation: F,
}

impl<F> RateMutator<F> {
    /// Creates a mutator applying `mutation` with
    /// probability `rate`.
    ///
    /// # Errors
    /// Returns an error if `rate` is not in `[0.0, 1.0]`.
    pub fn new(rate: f64, mutation: F) -> Result<RateMutator<F>, ConfigError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidMutationRate(rate));
        }
        Ok(RateMutator { rate, mutation })
    }

    /// Returns the mutation probability.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl<S, F> Mutator<S> for RateMutator<F>
where
    F: Fn(&mut S) + Send + Sync,
{
    fn mutate_count(&self, _state: &S) -> usize {
        rand::thread_rng().gen_bool(self.rate) as usize
    }

    fn mutate(&self, state: &mut S) {
        (self.mutation)(state)
    }
}

impl<F> fmt::Debug for RateMutator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateMutator")
            .field("rate", &self.rate)
            .finish()
    }
}

/// Selects two parents, each the winner of a binary
/// tournament between two sampled members. Ties go
/// to the first contestant.
#[derive(Debug)]
pub struct TournamentSelector<F> {
    evaluator: F,
}

impl<F> TournamentSelector<F> {
    pub fn new(evaluator: F) -> TournamentSelector<F> {
        TournamentSelector { evaluator }
    }
}

impl<S, F> Selector<S> for TournamentSelector<F>
where
    F: FitnessEvaluator<S>,
{
    fn select_parents(&self, population: &dyn Population<S>, parents: &mut Vec<Arc<S>>) {
        for _ in 0..2 {
            let (first, second) = match (population.sample(), population.sample()) {
                (Some(first), Some(second)) => (first, second),
                _ => return,
            };
            if self.evaluator.compare(&first, &second) != Ordering::Less {
                parents.push(first);
            } else {
                parents.push(second);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::Sowing;

    struct Identity;

    impl FitnessEvaluator<i64> for Identity {
        fn fitness(&self, state: &i64) -> i64 {
            *state
        }
    }

    /// Hands out members in a fixed cycle.
    struct Scripted {
        members: Vec<Arc<i64>>,
        next: std::sync::atomic::AtomicUsize,
    }

    impl Population<i64> for Scripted {
        fn sample(&self) -> Option<Arc<i64>> {
            if self.members.is_empty() {
                return None;
            }
            let i = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            Some(Arc::clone(&self.members[i % self.members.len()]))
        }

        fn sow(&self, member: Arc<i64>) -> Sowing<i64> {
            Sowing {
                evicted: member,
                completed_generation: false,
            }
        }

        fn size(&self) -> usize {
            self.members.len()
        }

        fn generation_count(&self) -> usize {
            0
        }
    }

    fn scripted(values: &[i64]) -> Scripted {
        Scripted {
            members: values.iter().copied().map(Arc::new).collect(),
            next: Default::default(),
        }
    }

    #[test]
    fn tournament_picks_fitter_contestants() {
        let population = scripted(&[1, 7, 9, 3]);
        let mut parents = vec![];

        TournamentSelector::new(Identity).select_parents(&population, &mut parents);

        assert_eq!(parents.iter().map(|p| **p).collect::<Vec<_>>(), [7, 9]);
    }

    #[test]
    fn tournament_on_empty_population_selects_nothing() {
        let population = scripted(&[]);
        let mut parents = vec![];

        TournamentSelector::new(Identity).select_parents(&population, &mut parents);

        assert!(parents.is_empty());
    }

    #[test]
    fn zero_rate_never_mutates() {
        let mutator = RateMutator::new(0.0, |s: &mut i64| *s += 1).unwrap();
        assert!((0..100).all(|_| mutator.mutate_count(&0) == 0));
    }

    #[test]
    fn invalid_rates_are_rejected() {
        assert!(matches!(
            RateMutator::new(-0.1, |_: &mut i64| {}),
            Err(ConfigError::InvalidMutationRate(_))
        ));
        assert!(RateMutator::new(f64::NAN, |_: &mut i64| {}).is_err());
    }
}

use super::{EvolutionEvent, EvolutionListener};
use crate::fitness::FitnessEvaluator;

use arc_swap::ArcSwapOption;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Tracks the fittest member ever sown into a population.
///
/// Register it as a listener on an engine; every added
/// member is offered as a candidate.
///
/// # Examples
/// ```
/// use agal::evolution::BestResult;
/// use agal::FitnessEvaluator;
/// use std::sync::Arc;
///
/// struct Value;
///
/// impl FitnessEvaluator<u32> for Value {
///     fn fitness(&self, state: &u32) -> i64 {
///         *state as i64
///     }
/// }
///
/// let best = BestResult::new(Value);
/// assert!(best.offer(&Arc::new(3)));
/// assert!(!best.offer(&Arc::new(2)));
/// assert_eq!(best.best().as_deref(), Some(&3));
/// ```
pub struct BestResult<S, F> {
    best: ArcSwapOption<S>,
    evaluator: F,
}

impl<S, F> BestResult<S, F>
where
    F: FitnessEvaluator<S>,
{
    pub fn new(evaluator: F) -> BestResult<S, F> {
        BestResult {
            best: ArcSwapOption::empty(),
            evaluator,
        }
    }

    /// Returns the best member seen so far, if any.
    pub fn best(&self) -> Option<Arc<S>> {
        self.best.load_full()
    }

    /// Records `candidate` if it is strictly fitter than
    /// the current best. Returns whether it was recorded.
    pub fn offer(&self, candidate: &Arc<S>) -> bool {
        let mut current = self.best.load_full();
        loop {
            if let Some(best) = &current {
                if self.evaluator.compare(candidate, best) != Ordering::Greater {
                    return false;
                }
            }
            let previous = self
                .best
                .compare_and_swap(&current, Some(Arc::clone(candidate)));
            if same_member(&*previous, &current) {
                return true;
            }
            current = (*previous).clone();
        }
    }
}

fn same_member<S>(first: &Option<Arc<S>>, second: &Option<Arc<S>>) -> bool {
    match (first, second) {
        (Some(first), Some(second)) => Arc::ptr_eq(first, second),
        (None, None) => true,
        _ => false,
    }
}

impl<S, F> EvolutionListener<S> for BestResult<S, F>
where
    S: Send + Sync,
    F: FitnessEvaluator<S>,
{
    fn on_event(&self, event: &EvolutionEvent<'_, S>) {
        if let EvolutionEvent::MemberAdded(member) = event {
            self.offer(member);
        }
    }
}

impl<S: fmt::Debug, F> fmt::Debug for BestResult<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BestResult")
            .field("best", &self.best.load_full())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    struct Identity;

    impl FitnessEvaluator<i64> for Identity {
        fn fitness(&self, state: &i64) -> i64 {
            *state
        }
    }

    #[test]
    fn concurrent_offers_keep_maximum() {
        let best = BestResult::new(Identity);

        thread::scope(|s| {
            for t in 0..8 {
                let best = &best;
                s.spawn(move || {
                    for i in 0..1000 {
                        best.offer(&Arc::new(i * 8 + t));
                    }
                });
            }
        });

        assert_eq!(best.best().as_deref(), Some(&7999));
    }

    #[test]
    fn listens_only_to_additions() {
        let best = BestResult::new(Identity);
        let removed = Arc::new(100);
        let added = Arc::new(1);

        best.on_event(&EvolutionEvent::MemberRemoved(&removed));
        assert!(best.best().is_none());

        best.on_event(&EvolutionEvent::MemberAdded(&added));
        assert_eq!(best.best().as_deref(), Some(&1));
    }
}

use super::{Population, PopulationConfig, Sowing};
use crate::errors::ConfigError;
use crate::fitness::FitnessEvaluator;

use arc_swap::ArcSwap;
use rand::Rng;

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

/// A fixed-size population shared by many threads
/// without locks.
///
/// Members live in an array of atomic slots. Sowing picks a
/// random slot and replaces its occupant with a compare-and-swap,
/// retrying if another thread got there first. Generations have
/// no barrier: instead, a rolling counter of successful sowings
/// wraps around every `size` sowings, and the thread that wraps
/// it advances the generation count. Threads in the same
/// generation may therefore be breeding from members of the
/// previous one.
///
/// # Examples
/// ```
/// use agal::populations::{Population, PopulationConfig, SharedPopulation};
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
/// let config = PopulationConfig {
///     size: 10,
///     ..PopulationConfig::default()
/// };
/// let population = SharedPopulation::new(&config, Value, || 0).unwrap();
///
/// for _ in 0..25 {
///     population.sow(Arc::new(1));
/// }
/// assert_eq!(population.size(), 10);
/// assert_eq!(population.generation_count(), 2);
/// assert_eq!(population.turnover(), 5);
/// ```
pub struct SharedPopulation<S, F> {
    slots: Box<[ArcSwap<S>]>,
    generation: AtomicUsize,
    turnover: AtomicUsize,
    retry_limit: usize,
    evaluator: F,
}

impl<S, F> SharedPopulation<S, F>
where
    F: FitnessEvaluator<S>,
{
    /// Creates a new population of `config.size` members,
    /// each generated by `seed`. The `evaluator` decides
    /// which members are preferentially replaced.
    ///
    /// # Errors
    /// Returns an error if the configured size is zero.
    pub fn new<G>(
        config: &PopulationConfig,
        evaluator: F,
        mut seed: G,
    ) -> Result<SharedPopulation<S, F>, ConfigError>
    where
        G: FnMut() -> S,
    {
        if config.size == 0 {
            return Err(ConfigError::ZeroPopulationSize);
        }
        Ok(SharedPopulation {
            slots: (0..config.size)
                .map(|_| ArcSwap::from_pointee(seed()))
                .collect(),
            generation: AtomicUsize::new(0),
            turnover: AtomicUsize::new(0),
            retry_limit: config.retry_limit,
            evaluator,
        })
    }

    /// Returns the number of successful sowings since
    /// the last generation boundary, in `[0, size)`.
    pub fn turnover(&self) -> usize {
        self.turnover.load(AtomicOrdering::Acquire)
    }

    /// Returns a snapshot of every current member.
    /// Under concurrent sowing, the snapshot may mix
    /// members from before and after any given sowing.
    pub fn members(&self) -> Vec<Arc<S>> {
        self.slots.iter().map(ArcSwap::load_full).collect()
    }

    /// Returns the population's fitness evaluator.
    pub fn evaluator(&self) -> &F {
        &self.evaluator
    }

    /// Replaces a randomly chosen member with `member`.
    /// Up to `retry_limit` times, a slot whose occupant
    /// is at least as fit as `member` is passed over.
    fn replace(&self, member: &Arc<S>) -> Arc<S> {
        let mut rng = rand::thread_rng();
        let mut retries = self.retry_limit;
        loop {
            let slot = &self.slots[rng.gen_range(0..self.slots.len())];
            let incumbent = slot.load_full();

            if retries > 0 && self.evaluator.compare(&incumbent, member) != Ordering::Less {
                retries -= 1;
                continue;
            }

            // Only install over the occupant we actually judged.
            let previous = slot.compare_and_swap(&incumbent, Arc::clone(member));
            if Arc::ptr_eq(&*previous, &incumbent) {
                return incumbent;
            }
        }
    }

    /// Counts a successful sowing, wrapping the turnover
    /// counter at the population size. Returns whether this
    /// call wrapped it and so completed a generation.
    fn count_turnover(&self) -> bool {
        let size = self.slots.len();
        let mut current = self.turnover.load(AtomicOrdering::Acquire);
        loop {
            let next = if current + 1 >= size { 0 } else { current + 1 };
            match self.turnover.compare_exchange_weak(
                current,
                next,
                AtomicOrdering::AcqRel,
                AtomicOrdering::Acquire,
            ) {
                Ok(_) if next == 0 => {
                    let generation = self.generation.fetch_add(1, AtomicOrdering::AcqRel) + 1;
                    tracing::trace!(generation, "population turned over");
                    return true;
                }
                Ok(_) => return false,
                Err(actual) => current = actual,
            }
        }
    }
}

impl<S, F> Population<S> for SharedPopulation<S, F>
where
    S: Send + Sync,
    F: FitnessEvaluator<S>,
{
    fn sample(&self) -> Option<Arc<S>> {
        if self.slots.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..self.slots.len());
        Some(self.slots[index].load_full())
    }

    fn sow(&self, member: Arc<S>) -> Sowing<S> {
        let evicted = self.replace(&member);
        Sowing {
            evicted,
            completed_generation: self.count_turnover(),
        }
    }

    fn size(&self) -> usize {
        self.slots.len()
    }

    fn generation_count(&self) -> usize {
        self.generation.load(AtomicOrdering::Acquire)
    }
}

impl<S, F> fmt::Debug for SharedPopulation<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPopulation")
            .field("size", &self.slots.len())
            .field("generation", &self.generation.load(AtomicOrdering::Relaxed))
            .field("turnover", &self.turnover.load(AtomicOrdering::Relaxed))
            .field("retry_limit", &self.retry_limit)
            .finish()
    }
}

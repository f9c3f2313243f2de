//! A Population is the pool of candidate solutions
//! shared by every worker of an evolutionary search.
//! Workers continuously sample parents from it and
//! sow offspring into it, with no generational barrier.
mod config;
mod shared;

pub use config::{PopulationConfig, DEFAULT_RETRY_LIMIT};
pub use shared::SharedPopulation;

use std::sync::Arc;

/// The result of sowing a member into a population.
#[derive(Debug)]
pub struct Sowing<S> {
    /// The member that was replaced.
    pub evicted: Arc<S>,
    /// Whether this sowing completed a generation,
    /// i.e. a full turnover of the population.
    pub completed_generation: bool,
}

/// A thread-safe population of states.
///
/// Implementations are shared by all worker threads,
/// so every method takes `&self` and must tolerate
/// arbitrary concurrent calls.
pub trait Population<S>: Send + Sync {
    /// Returns a random member without removing it,
    /// or `None` if the population holds no members.
    fn sample(&self) -> Option<Arc<S>>;

    /// Adds `member` to the population, evicting
    /// another member to make room for it.
    fn sow(&self, member: Arc<S>) -> Sowing<S>;

    /// Returns the number of members in the population.
    fn size(&self) -> usize;

    /// Returns the number of generations completed so far.
    fn generation_count(&self) -> usize;

    /// Signals that the population will never again be
    /// used, so any cleanup may take place.
    fn destroy(&self) {}
}

impl<S, P> Population<S> for Arc<P>
where
    P: Population<S> + ?Sized,
{
    fn sample(&self) -> Option<Arc<S>> {
        (**self).sample()
    }

    fn sow(&self, member: Arc<S>) -> Sowing<S> {
        (**self).sow(member)
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn generation_count(&self) -> usize {
        (**self).generation_count()
    }

    fn destroy(&self) {
        (**self).destroy()
    }
}

//! Evolution engines and the events they report.
//!
//! An engine's [`evolve`] is run concurrently by every
//! worker thread of an [`EvolutionController`], so engines
//! and everything they share must be thread-safe, and should
//! proceed with as little direct synchronization as possible.
//!
//! [`evolve`]: EvolutionAlgorithm::evolve
//! [`EvolutionController`]: crate::control::EvolutionController
mod best;
mod eugenic;
mod strategies;

pub use best::BestResult;
pub use eugenic::EugenicAlgorithm;
pub use strategies::{Mutator, RateMutator, Selector, StateManager, TournamentSelector};

use crate::control::CancellationToken;

use arc_swap::ArcSwap;

use std::fmt;
use std::sync::Arc;

/// Lifecycle events reported by an evolution engine.
///
/// `Begin` and `End` are reported once per worker,
/// not once per run.
#[derive(Debug)]
pub enum EvolutionEvent<'a, S> {
    /// A worker has started evolving.
    Begin,
    /// A worker has stopped evolving.
    End,
    /// The population completed a generation. Holds the
    /// generation count after the boundary.
    NewGeneration(usize),
    /// A member was sown into the population.
    MemberAdded(&'a Arc<S>),
    /// A member was evicted from the population.
    MemberRemoved(&'a Arc<S>),
}

/// An observer of evolution events.
///
/// Listeners are notified synchronously from worker
/// threads, possibly from several at once, and so should
/// be quick and thread-safe.
pub trait EvolutionListener<S>: Send + Sync {
    fn on_event(&self, event: &EvolutionEvent<'_, S>);
}

/// A runnable, thread-safe evolution engine.
pub trait EvolutionAlgorithm: Send + Sync + 'static {
    /// The type of state being evolved.
    type Member: Send + Sync + 'static;

    /// Evolves until `token` is cancelled. The token is only
    /// checked between breeding steps, so a step in progress
    /// always completes.
    fn evolve(&self, token: &CancellationToken);

    /// Registers a listener for this engine's events.
    fn register_listener(&self, listener: Arc<dyn EvolutionListener<Self::Member>>);
}

/// A copy-on-write registry of listeners.
///
/// Notifying never blocks; registering copies the
/// list, which is expected to be rare.
pub struct Listeners<S> {
    listeners: ArcSwap<Vec<Arc<dyn EvolutionListener<S>>>>,
}

impl<S> Listeners<S> {
    pub fn new() -> Listeners<S> {
        Listeners {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Adds `listener` to the registry.
    pub fn register(&self, listener: Arc<dyn EvolutionListener<S>>) {
        self.listeners.rcu(|current| {
            let mut updated = Vec::clone(current);
            updated.push(Arc::clone(&listener));
            updated
        });
    }

    /// Delivers `event` to every registered listener,
    /// in registration order.
    pub fn notify(&self, event: &EvolutionEvent<'_, S>) {
        for listener in self.listeners.load().iter() {
            listener.on_event(event);
        }
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    /// Returns whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for Listeners<S> {
    fn default() -> Listeners<S> {
        Listeners::new()
    }
}

impl<S> fmt::Debug for Listeners<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

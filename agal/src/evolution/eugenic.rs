use super::{
    EvolutionAlgorithm, EvolutionEvent, EvolutionListener, Listeners, Mutator, Selector,
    StateManager,
};
use crate::control::CancellationToken;
use crate::populations::Population;

use std::fmt;
use std::sync::Arc;

/// A steady-state genetic algorithm over a shared population.
///
/// Each breeding step selects two parents, reproduces them into
/// a single child, mutates the child as often as the mutator
/// asks, and sows it back into the population. There is no
/// generational barrier: every worker breeds continuously, and
/// generation boundaries are whatever the population reports.
///
/// Events reported, per breeding step: `MemberAdded` for the
/// child, `MemberRemoved` for the member it evicted, and
/// `NewGeneration` if the sowing completed a generation.
/// `Begin` and `End` bracket each worker's run.
pub struct EugenicAlgorithm<S> {
    population: Arc<dyn Population<S>>,
    state_manager: Box<dyn StateManager<S>>,
    selector: Box<dyn Selector<S>>,
    mutator: Box<dyn Mutator<S>>,
    listeners: Listeners<S>,
}

impl<S> EugenicAlgorithm<S>
where
    S: Send + Sync + 'static,
{
    /// Creates an engine breeding over `population`.
    ///
    /// # Examples
    /// ```
    /// use agal::evolution::{EugenicAlgorithm, RateMutator, StateManager, TournamentSelector};
    /// use agal::populations::{PopulationConfig, SharedPopulation};
    /// use agal::FitnessEvaluator;
    /// use std::sync::Arc;
    ///
    /// struct Ones;
    ///
    /// impl StateManager<Vec<bool>> for Ones {
    ///     fn randomize(&self) -> Vec<bool> {
    ///         (0..8).map(|_| rand::random()).collect()
    ///     }
    ///
    ///     fn reproduce(&self, mother: &Vec<bool>, father: &Vec<bool>) -> Vec<bool> {
    ///         mother[..4].iter().chain(&father[4..]).copied().collect()
    ///     }
    /// }
    ///
    /// impl FitnessEvaluator<Vec<bool>> for Ones {
    ///     fn fitness(&self, state: &Vec<bool>) -> i64 {
    ///         state.iter().filter(|b| **b).count() as i64
    ///     }
    /// }
    ///
    /// let population = Arc::new(
    ///     SharedPopulation::new(&PopulationConfig::default(), Ones, || Ones.randomize()).unwrap(),
    /// );
    /// let engine = EugenicAlgorithm::new(
    ///     population,
    ///     Ones,
    ///     TournamentSelector::new(Ones),
    ///     RateMutator::new(0.1, |s: &mut Vec<bool>| s[0] = !s[0]).unwrap(),
    /// );
    /// ```
    pub fn new<P, T, X, M>(
        population: Arc<P>,
        state_manager: T,
        selector: X,
        mutator: M,
    ) -> EugenicAlgorithm<S>
    where
        P: Population<S> + 'static,
        T: StateManager<S> + 'static,
        X: Selector<S> + 'static,
        M: Mutator<S> + 'static,
    {
        EugenicAlgorithm {
            population,
            state_manager: Box::new(state_manager),
            selector: Box::new(selector),
            mutator: Box::new(mutator),
            listeners: Listeners::new(),
        }
    }

    /// Returns the population being evolved.
    pub fn population(&self) -> &Arc<dyn Population<S>> {
        &self.population
    }

    /// Reproduces a child from two parents and
    /// applies any mutations to it.
    fn breed(&self, mother: &S, father: &S) -> S {
        let mut child = self.state_manager.reproduce(mother, father);
        for _ in 0..self.mutator.mutate_count(&child) {
            self.mutator.mutate(&mut child);
        }
        child
    }

    /// Performs a single breeding step. `parents`
    /// is scratch space reused between steps.
    fn step(&self, parents: &mut Vec<Arc<S>>) {
        parents.clear();
        self.selector.select_parents(&*self.population, parents);
        let (mother, father) = match parents.as_slice() {
            [mother, father, ..] => (mother, father),
            _ => return,
        };

        let child = Arc::new(self.breed(mother, father));
        let sowing = self.population.sow(Arc::clone(&child));

        self.listeners.notify(&EvolutionEvent::MemberAdded(&child));
        self.listeners
            .notify(&EvolutionEvent::MemberRemoved(&sowing.evicted));
        if sowing.completed_generation {
            self.listeners.notify(&EvolutionEvent::NewGeneration(
                self.population.generation_count(),
            ));
        }
    }
}

impl<S> EvolutionAlgorithm for EugenicAlgorithm<S>
where
    S: Send + Sync + 'static,
{
    type Member = S;

    fn evolve(&self, token: &CancellationToken) {
        self.listeners.notify(&EvolutionEvent::Begin);

        let mut parents = Vec::with_capacity(2);
        while !token.is_cancelled() {
            self.step(&mut parents);
        }

        self.listeners.notify(&EvolutionEvent::End);
    }

    fn register_listener(&self, listener: Arc<dyn EvolutionListener<S>>) {
        self.listeners.register(listener);
    }
}

impl<S> fmt::Debug for EugenicAlgorithm<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EugenicAlgorithm")
            .field("population_size", &self.population.size())
            .field("generation", &self.population.generation_count())
            .field("listeners", &self.listeners)
            .finish()
    }
}

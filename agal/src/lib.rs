//! A framework for running evolutionary searches across many
//! threads at once, all breeding into one shared population.
//!
//! There are no generational barriers: every worker continuously
//! samples parents from the population and sows offspring back
//! into it, and generations are counted as they turn over. The
//! population and the supporting collections are built for this
//! access pattern, with atomic slots in place of locks wherever
//! possible.
//!
//! A search is assembled from a problem-specific [`StateManager`]
//! and [`FitnessEvaluator`], a [`SharedPopulation`], an engine such
//! as [`EugenicAlgorithm`], and an [`EvolutionController`] to run
//! the engine on a pool of worker threads until a
//! [`StopCondition`] fires.
//!
//! [`StateManager`]: evolution::StateManager
//! [`SharedPopulation`]: populations::SharedPopulation
//! [`EugenicAlgorithm`]: evolution::EugenicAlgorithm
//! [`EvolutionController`]: control::EvolutionController
//! [`StopCondition`]: control::StopCondition
//!
//! # Example usage: evolving a string of all ones
//! ```
//! use agal::control::{EvolutionController, FitnessThresholdStop, StopCondition, TimedStop};
//! use agal::evolution::{
//!     BestResult, EugenicAlgorithm, EvolutionAlgorithm, RateMutator, StateManager,
//!     TournamentSelector,
//! };
//! use agal::populations::{Population, PopulationConfig, SharedPopulation};
//! use agal::FitnessEvaluator;
//! use rand::Rng;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! const LENGTH: usize = 32;
//!
//! struct OneMax;
//!
//! impl StateManager<Vec<bool>> for OneMax {
//!     fn randomize(&self) -> Vec<bool> {
//!         (0..LENGTH).map(|_| rand::random()).collect()
//!     }
//!
//!     fn reproduce(&self, mother: &Vec<bool>, father: &Vec<bool>) -> Vec<bool> {
//!         let cut = rand::thread_rng().gen_range(0..LENGTH);
//!         mother[..cut].iter().chain(&father[cut..]).copied().collect()
//!     }
//! }
//!
//! impl FitnessEvaluator<Vec<bool>> for OneMax {
//!     fn fitness(&self, state: &Vec<bool>) -> i64 {
//!         state.iter().filter(|bit| **bit).count() as i64
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PopulationConfig {
//!         size: 50,
//!         ..PopulationConfig::default()
//!     };
//!     let population = Arc::new(SharedPopulation::new(&config, OneMax, || OneMax.randomize())?);
//!
//!     let engine = Arc::new(EugenicAlgorithm::new(
//!         population.clone(),
//!         OneMax,
//!         TournamentSelector::new(OneMax),
//!         RateMutator::new(0.3, |state: &mut Vec<bool>| {
//!             let i = rand::thread_rng().gen_range(0..LENGTH);
//!             state[i] = !state[i];
//!         })?,
//!     ));
//!
//!     let best = Arc::new(BestResult::new(OneMax));
//!     engine.register_listener(best.clone());
//!
//!     let solved: Arc<dyn StopCondition<Vec<bool>>> =
//!         Arc::new(FitnessThresholdStop::new(OneMax, LENGTH as i64));
//!     let timeout: Arc<dyn StopCondition<Vec<bool>>> =
//!         Arc::new(TimedStop::new(Duration::from_secs(10)));
//!     let controller = EvolutionController::new(engine, 4, vec![solved, timeout]);
//!     controller.start()?;
//!     controller.await_termination()?;
//!
//!     let best = best.best().ok_or("nothing was bred")?;
//!     println!(
//!         "Best after {} generations: {}",
//!         population.generation_count(),
//!         serde_json::to_string(&*best)?
//!     );
//!     Ok(())
//! }
//! ```
pub mod collections;
pub mod control;
pub mod errors;
pub mod evolution;
pub mod fitness;
pub mod populations;

pub use fitness::{FitnessDirection, FitnessEvaluator};

//! Worker pool lifecycle: starting, running and
//! stopping evolution engines across threads.
//!
//! An [`EvolutionController`] owns a fixed set of worker
//! threads, each running the same engine. Workers are
//! released together through a one-shot start gate, and
//! stopped cooperatively through a shared
//! [`CancellationToken`]. [`StopCondition`]s observe engine
//! events and ask the controller to stop when they fire.
mod cancellation;
mod controller;
mod gate;
mod stop;

pub use cancellation::CancellationToken;
pub use controller::{EvolutionController, Phase, StopHandle};
pub use gate::StartGate;
pub use stop::{FitnessThresholdStop, GenerationLimitStop, StopCondition, StopTrigger, TimedStop};

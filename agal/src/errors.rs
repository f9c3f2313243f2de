use std::io;

/// An error type indicating a structure was
/// configured with values it cannot operate under.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A population must hold at least one member.
    #[error("population size must be greater than zero")]
    ZeroPopulationSize,
    /// Segments must hold at least one element.
    #[error("segment size must be greater than zero")]
    ZeroSegmentSize,
    /// Mutation rates are probabilities.
    #[error("mutation rate {0} is outside of [0.0, 1.0]")]
    InvalidMutationRate(f64),
}

/// An error type indicating misuse of an
/// [`EvolutionController`] or a failure of
/// one of its threads.
///
/// [`EvolutionController`]: crate::control::EvolutionController
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// `start` was called more than once.
    #[error("evolution controller has already been started")]
    AlreadyStarted,
    /// Termination was awaited on a controller that never started.
    #[error("evolution controller was never started")]
    NotStarted,
    /// The operating system refused to spawn a thread.
    #[error("failed to spawn evolution thread: {0}")]
    Spawn(#[from] io::Error),
    /// The supervising thread panicked while shutting down.
    #[error("evolution supervisor thread panicked")]
    SupervisorPanicked,
}

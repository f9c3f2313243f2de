use serde::{Deserialize, Serialize};

/// Number of times a sowing may skip over an incumbent
/// at least as fit as the newcomer before it settles for
/// whichever slot it samples next.
pub const DEFAULT_RETRY_LIMIT: usize = 3;

/// Configuration data for population creation
/// and replacement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of members in the population.
    /// Must be greater than zero.
    pub size: usize,
    /// Number of times a sowing may resample after
    /// finding an incumbent that is not worse than the
    /// incoming member. Higher values bias replacement
    /// more strongly toward weak members, at the cost of
    /// extra sampling under contention.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: usize,
}

fn default_retry_limit() -> usize {
    DEFAULT_RETRY_LIMIT
}

impl PopulationConfig {
    /// Returns a "zero-valued" configuration.
    /// All values are 0.
    ///
    /// # Note
    /// This value is not usable as-is, as populations
    /// must hold at least one member. It is meant as a way
    /// to abbreviate configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use agal::populations::PopulationConfig;
    ///
    /// let config = PopulationConfig {
    ///     size: 100,
    ///     ..PopulationConfig::zero()
    /// };
    /// assert_eq!(config.retry_limit, 0);
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: 0,
            retry_limit: 0,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> PopulationConfig {
        PopulationConfig {
            size: 100,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

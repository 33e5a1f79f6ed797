//! Tuning knobs for [`Memoized`](super::Memoized).

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

/// Configuration of a memoized function.
///
/// ```rust
/// use lazymemo::MemoConfig;
///
/// let config = MemoConfig::new().with_shards(16);
/// assert_eq!(config.shards(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoConfig {
    shards: usize,
}

impl MemoConfig {
    /// Upper bound on the effective shard count.
    pub const MAX_SHARDS: usize = 1 << 16;

    /// The default configuration: four shards per available CPU.
    pub fn new() -> Self {
        let cpus = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self {
            shards: (cpus * 4).next_power_of_two(),
        }
    }

    /// Sets the number of key-map shards. Clamped to `1..=Self::MAX_SHARDS`, then
    /// rounded up to a power of two.
    #[must_use]
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// The effective shard count.
    #[inline]
    pub fn shards(&self) -> usize {
        // Clamping first keeps `next_power_of_two` from overflowing.
        self.shards.clamp(1, Self::MAX_SHARDS).next_power_of_two()
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self::new()
    }
}

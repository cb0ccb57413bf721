//! Think time between a worker's calls

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::Duration;

/// Uniformly random pauses between calls, in whole milliseconds
pub struct ThinkTime {
    min_ms: u64,
    max_ms: u64,
    rng: StdRng,
}

impl ThinkTime {
    /// Create a new think time generator
    ///
    /// # Arguments
    /// * `range` - Shortest and longest pause, inclusive. Swapped if given the wrong way round.
    /// * `seed` - Optional seed for reproducibility
    pub fn new(range: (Duration, Duration), seed: Option<u64>) -> Self {
        let (a, b) = (range.0.as_millis() as u64, range.1.as_millis() as u64);
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };

        Self {
            min_ms: a.min(b),
            max_ms: a.max(b),
            rng,
        }
    }

    /// Sample the next pause
    pub fn next_pause(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(self.min_ms..=self.max_ms))
    }
}

//! Key distribution for multi-key scenarios

use std::ops::RangeInclusive;

use keyed_batcher::Key;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Distribution of keys for a scenario
#[derive(Debug, Clone)]
pub enum KeyDistribution {
    /// Always use the same key
    Single(Key),
    /// Uniform random selection across a range of keys
    Uniform(RangeInclusive<Key>),
}

impl KeyDistribution {
    /// The largest key this distribution can produce.
    pub fn max_key(&self) -> Key {
        match self {
            KeyDistribution::Single(key) => *key,
            KeyDistribution::Uniform(keys) => *keys.end(),
        }
    }
}

/// Generator for producing keys according to a distribution
pub struct KeyGenerator {
    distribution: KeyDistribution,
    rng: StdRng,
}

impl KeyGenerator {
    /// Create a new key generator
    pub fn new(distribution: KeyDistribution, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };

        Self { distribution, rng }
    }

    /// Generate the next key
    pub fn next_key(&mut self) -> Key {
        match &self.distribution {
            KeyDistribution::Single(key) => *key,
            KeyDistribution::Uniform(keys) => self.rng.random_range(keys.clone()),
        }
    }
}

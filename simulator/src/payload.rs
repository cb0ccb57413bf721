//! Random payloads

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Generates fixed-length payloads of random values
pub struct PayloadGenerator {
    len: usize,
    rng: StdRng,
}

impl PayloadGenerator {
    pub fn new(len: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };

        Self { len, rng }
    }

    pub fn next_payload(&mut self) -> Vec<u64> {
        (0..self.len).map(|_| self.rng.random()).collect()
    }
}

//! Test RNG: deterministic `DeterministicRng` implementation for tests.

use accounts_core::rng::DeterministicRng;

/// An RNG that returns values from a predetermined sequence, cycling when it
/// reaches the end. An empty sequence always yields zero.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<u64>,
    index: usize,
}

impl SequenceRng {
    /// Create a new `SequenceRng` with the given values.
    #[must_use]
    pub fn new(values: Vec<u64>) -> Self {
        Self { values, index: 0 }
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u64(&mut self) -> u64 {
        if self.values.is_empty() {
            return 0;
        }
        let val = self.values[self.index % self.values.len()];
        self.index += 1;
        val
    }
}

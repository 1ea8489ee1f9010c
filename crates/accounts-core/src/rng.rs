//! Random number generator abstraction for determinism.
//!
//! In production, this wraps the thread-local RNG. In tests, a seeded or
//! recorded implementation is injected so that generated salts are
//! repeatable.

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u64`.
    fn next_u64(&mut self) -> u64;
}

/// Production RNG backed by `rand`'s thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRng;

impl DeterministicRng for SystemRng {
    fn next_u64(&mut self) -> u64 {
        rand::random()
    }
}

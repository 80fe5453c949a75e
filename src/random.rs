//! This module wraps the random number generator used to produce toy events
//! behind a small interface, so that batches of events can be scheduled
//! reproducibly across threads.

use crate::numeric::Float;
use rand::{Rng, SeedableRng};

/// Random number generation engine in use
type Engine = rand_xoshiro::Xoshiro256Plus;

/// Seeded random number generator
#[derive(Clone)]
pub struct RandomGenerator {
    rng: Engine,
}
//
impl RandomGenerator {
    /// Spawn a new random number generator
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Engine::seed_from_u64(seed),
        }
    }

    /// Generate a random floating-point number between 0 and 1
    pub fn random(&mut self) -> Float {
        self.rng.gen()
    }

    /// Generate an array of random numbers between 0 and 1
    pub fn random_array<const N: usize>(&mut self) -> [Float; N] {
        self.rng.gen()
    }

    /// Advance state as if random_array::<N>() had been called
    #[cfg(all(feature = "multi-threading", not(feature = "faster-threading")))]
    pub fn skip_array<const N: usize>(&mut self) {
        self.random_array::<N>();
    }

    /// Advance state in an arbitrary but maximally fast way
    #[cfg(all(feature = "multi-threading", feature = "faster-threading"))]
    pub fn jump(&mut self) {
        self.rng.jump();
    }
}

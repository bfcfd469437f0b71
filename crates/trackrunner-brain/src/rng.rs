//! RNG trait abstraction for policies
//!
//! Every random branch (exploration, minibatch sampling, weight init,
//! mutation) goes through `BrainRng` so callers can pass a seeded generator
//! and get reproducible runs.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

/// Random number generator used by policies and simulations
pub trait BrainRng {
    /// Generate random f32 in [0.0, 1.0)
    fn gen_f32(&mut self) -> f32;

    /// Generate a uniform index in [0, len). `len` must be non-zero.
    fn gen_index(&mut self, len: usize) -> usize;

    /// Check if random value is less than probability threshold
    fn check_probability(&mut self, probability: f32) -> bool {
        self.gen_f32() < probability
    }

    /// Uniform value in [-magnitude, magnitude)
    fn gen_symmetric(&mut self, magnitude: f32) -> f32 {
        (self.gen_f32() * 2.0 - 1.0) * magnitude
    }
}

impl<T: ?Sized + rand::Rng> BrainRng for T {
    fn gen_f32(&mut self) -> f32 {
        self.random::<f32>()
    }

    fn gen_index(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// Seeded generator used throughout trackrunner
pub fn seeded(seed: u64) -> Xoshiro256StarStar {
    Xoshiro256StarStar::seed_from_u64(seed)
}

//! Injectable randomness.
//!
//! The matchmaker needs randomness in exactly three places: queue-wait
//! jitter, robot move selection, and robot balance synthesis. None of it
//! needs to be replayable, so unlike a deterministic simulation this wraps
//! the process RNG behind a trait purely so tests can substitute a fixed
//! sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::domain::Move;

/// Source of randomness for matchmaking and robot behavior.
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `[low, high)`.
    fn uniform_range(&self, low: i64, high: i64) -> i64;

    /// Uniform float in `[0.0, 1.0)`.
    fn uniform_unit(&self) -> f64;

    /// Uniform pick of a rock/paper/scissors move.
    fn random_move(&self) -> Move {
        match self.uniform_range(0, 3) {
            0 => Move::Stone,
            1 => Move::Paper,
            _ => Move::Scissors,
        }
    }
}

/// Thread-safe RNG backed by `rand`'s `StdRng`, reseeded from OS entropy.
pub struct SharedRng {
    inner: Mutex<StdRng>,
}

impl SharedRng {
    /// Seed from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed deterministically, for reproducible tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SharedRng {
    fn uniform_range(&self, low: i64, high: i64) -> i64 {
        let mut guard = self.inner.lock().expect("rng mutex poisoned");
        guard.gen_range(low..high)
    }

    fn uniform_unit(&self) -> f64 {
        let mut guard = self.inner.lock().expect("rng mutex poisoned");
        guard.gen::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_range_stays_in_bounds() {
        let rng = SharedRng::from_seed(42);
        for _ in 0..1000 {
            let v = rng.uniform_range(4, 7);
            assert!((4..7).contains(&v));
        }
    }

    #[test]
    fn uniform_unit_stays_in_bounds() {
        let rng = SharedRng::from_seed(7);
        for _ in 0..1000 {
            let v = rng.uniform_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn random_move_only_yields_valid_moves() {
        let rng = SharedRng::from_seed(1);
        for _ in 0..1000 {
            let m = rng.random_move();
            assert!(matches!(m, Move::Stone | Move::Paper | Move::Scissors));
        }
    }
}

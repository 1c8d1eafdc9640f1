// src/backend/rng.rs
// Random source used by negative sampling.
// The layers only ever need "give me an index below `bound`", so that is the
// whole interface. Tests swap in deterministic stubs, training code uses
// `StdRandom`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform integer generator driving the selection shuffles
pub trait RandomSource {
    /// Returns a value in `[0, bound)`. `bound` is always at least 1.
    fn next(&mut self, bound: usize) -> usize;
}

/// `RandomSource` backed by `rand`'s standard generator
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Deterministic generator, for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from the operating system
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::from_os()
    }
}

impl RandomSource for StdRandom {
    fn next(&mut self, bound: usize) -> usize {
        if bound <= 1 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }
}

/// In-place Fisher-Yates shuffle.
///
/// Walks forward and swaps slot `i` with a slot drawn from `[0, i]`, the same
/// visiting order as the classic `random_shuffle`, so a stub source yields a
/// predictable permutation.
pub fn shuffle<R>(items: &mut [usize], rng: &mut R)
where
    R: RandomSource + ?Sized,
{
    for i in 1..items.len() {
        let j = rng.next(i + 1);
        items.swap(i, j);
    }
}

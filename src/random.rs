//! Uniform selection over the spin pools.
//!
//! All randomness used by a spin goes through a [`RandomSource`] so the
//! session can run against a seeded generator or a scripted one.

use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};

pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;
}

/// Adapts any `rand` generator to [`RandomSource`].
#[derive(Clone, Debug)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn unit(&mut self) -> f64 {
        (**self).unit()
    }

    fn index(&mut self, len: usize) -> usize {
        (**self).index(len)
    }
}

/// Picks one element uniformly, with replacement. `None` for an empty slice.
pub fn pick<'a, T>(items: &'a [T], rng: &mut impl RandomSource) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let idx = rng.index(items.len());
    items.get(idx)
}

//! Core traits for dflow
//!
//! Samplers and accumulators depend on [`RandomSource`] only, never on a
//! concrete generator. Any `rand` generator is a random source, so callers seed
//! a `StdRng` and pass it down.

use rand::Rng;
use rand_distr::StandardNormal;

/// The two random primitives the simulation consumes.
pub trait RandomSource {
    /// Uniform variate in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Standard normal variate `N(0, 1)`.
    fn standard_normal(&mut self) -> f64;
}

impl<R: Rng + ?Sized> RandomSource for R {
    #[inline]
    fn uniform(&mut self) -> f64 {
        self.random::<f64>()
    }

    #[inline]
    fn standard_normal(&mut self) -> f64 {
        self.sample(StandardNormal)
    }
}

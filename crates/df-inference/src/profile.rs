//! Flow profiles.
//!
//! A [`FlowProfile`] bins an observable in equal-width pseudorapidity bins and
//! keeps, per bin, the entry count and the first two moments of the observable.
//! The per-bin mean and the standard error of the mean are derived on demand.
//! Profiles with identical binning can be merged, which is how per-chunk
//! partial results are combined.

use df_core::{Error, RandomSource, Result};
use serde::Serialize;

use crate::particle::{Charge, Particle};

/// Moments of the observable in one bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProfileBin {
    /// Number of fills.
    pub entries: u64,
    /// Sum of filled values.
    pub sum: f64,
    /// Sum of squared filled values.
    pub sum_sq: f64,
}

impl ProfileBin {
    #[inline]
    fn add(&mut self, y: f64) {
        self.entries += 1;
        self.sum += y;
        self.sum_sq += y * y;
    }

    /// Mean of the filled values (0 for an empty bin).
    pub fn mean(&self) -> f64 {
        if self.entries == 0 { 0.0 } else { self.sum / self.entries as f64 }
    }

    /// Sample standard deviation (0 with fewer than two entries).
    pub fn std_dev(&self) -> f64 {
        if self.entries < 2 {
            return 0.0;
        }
        let n = self.entries as f64;
        let mean = self.sum / n;
        let var = (self.sum_sq - n * mean * mean) / (n - 1.0);
        var.max(0.0).sqrt()
    }

    /// Standard error of the mean, `std_dev / sqrt(entries)`.
    pub fn error(&self) -> f64 {
        if self.entries < 2 { 0.0 } else { self.std_dev() / (self.entries as f64).sqrt() }
    }

    fn merge(&mut self, other: &ProfileBin) {
        self.entries += other.entries;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }
}

/// Equal-width profile of an observable versus pseudorapidity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowProfile {
    lo: f64,
    hi: f64,
    bins: Vec<ProfileBin>,
    underflow: u64,
    overflow: u64,
}

impl FlowProfile {
    /// `n_bins` equal bins over `[lo, hi]`.
    pub fn new(n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Configuration("profile needs at least one bin".to_string()));
        }
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(Error::Configuration(format!(
                "profile range must be finite with lo < hi, got [{lo}, {hi}]"
            )));
        }
        Ok(Self { lo, hi, bins: vec![ProfileBin::default(); n_bins], underflow: 0, overflow: 0 })
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Range `(lo, hi)`.
    pub fn range(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// Bin width.
    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.bins.len() as f64
    }

    /// Center of bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        self.lo + (i as f64 + 0.5) * self.bin_width()
    }

    /// Bin containing `x`. `x == hi` belongs to the last bin.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if !(x >= self.lo && x <= self.hi) {
            return None;
        }
        let i = ((x - self.lo) / self.bin_width()) as usize;
        Some(i.min(self.bins.len() - 1))
    }

    /// All bins.
    pub fn bins(&self) -> &[ProfileBin] {
        &self.bins
    }

    /// Fills that fell below the range.
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    /// Fills that fell above the range (or were NaN).
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Total number of fills, including out-of-range ones.
    pub fn entries(&self) -> u64 {
        self.bins.iter().map(|b| b.entries).sum::<u64>() + self.underflow + self.overflow
    }

    /// Add `y` to the bin containing `x`.
    pub fn fill(&mut self, x: f64, y: f64) {
        match self.bin_index(x) {
            Some(i) => self.bins[i].add(y),
            None if x < self.lo => self.underflow += 1,
            None => self.overflow += 1,
        }
    }

    /// `(center, mean, error)` for every bin, empty bins included.
    pub fn points(&self) -> Vec<(f64, f64, f64)> {
        self.bins
            .iter()
            .enumerate()
            .map(|(i, b)| (self.bin_center(i), b.mean(), b.error()))
            .collect()
    }

    /// Add the contents of `other` (same binning required).
    pub fn merge(&mut self, other: &FlowProfile) -> Result<()> {
        if self.bins.len() != other.bins.len() || self.lo != other.lo || self.hi != other.hi {
            return Err(Error::Computation(format!(
                "cannot merge profiles with different binning: {} bins [{}, {}] vs {} bins [{}, {}]",
                self.bins.len(),
                self.lo,
                self.hi,
                other.bins.len(),
                other.lo,
                other.hi
            )));
        }
        for (a, b) in self.bins.iter_mut().zip(&other.bins) {
            a.merge(b);
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        Ok(())
    }
}

/// The pair of per-charge profiles filled during one scan step.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowAccumulator {
    positive: FlowProfile,
    negative: FlowProfile,
    smearing_sigma: f64,
}

impl FlowAccumulator {
    /// Empty profiles over `[-half_range, half_range]`, smearing width `smearing_sigma`.
    pub fn new(n_bins: usize, half_range: f64, smearing_sigma: f64) -> Result<Self> {
        if !smearing_sigma.is_finite() || smearing_sigma < 0.0 {
            return Err(Error::Configuration(format!(
                "smearing sigma must be finite and >= 0, got {smearing_sigma}"
            )));
        }
        Ok(Self {
            positive: FlowProfile::new(n_bins, -half_range, half_range)?,
            negative: FlowProfile::new(n_bins, -half_range, half_range)?,
            smearing_sigma,
        })
    }

    /// Fill `cos(phi + delta)`, `delta ~ N(0, sigma)`, into the profile of the
    /// particle's charge. No normal variate is drawn when sigma is zero.
    pub fn fill<R: RandomSource + ?Sized>(&mut self, particle: &Particle, rng: &mut R) {
        let delta =
            if self.smearing_sigma > 0.0 { self.smearing_sigma * rng.standard_normal() } else { 0.0 };
        let y = (particle.phi + delta).cos();
        self.profile_mut(particle.charge).fill(particle.eta, y);
    }

    fn profile_mut(&mut self, charge: Charge) -> &mut FlowProfile {
        match charge {
            Charge::Positive => &mut self.positive,
            Charge::Negative => &mut self.negative,
        }
    }

    /// Profile for `charge`.
    pub fn profile(&self, charge: Charge) -> &FlowProfile {
        match charge {
            Charge::Positive => &self.positive,
            Charge::Negative => &self.negative,
        }
    }

    /// Smearing width in radians.
    pub fn smearing_sigma(&self) -> f64 {
        self.smearing_sigma
    }

    /// Merge another accumulator's profiles into this one.
    pub fn merge(&mut self, other: &FlowAccumulator) -> Result<()> {
        self.positive.merge(&other.positive)?;
        self.negative.merge(&other.negative)
    }

    /// Consume into `(positive, negative)` profiles.
    pub fn into_profiles(self) -> (FlowProfile, FlowProfile) {
        (self.positive, self.negative)
    }
}

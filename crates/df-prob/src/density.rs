//! Closed-form bounded densities.
//!
//! Densities are unnormalized: the sampler normalizes numerically on its grid.
//! Parameters are fixed at construction; a different parameter value means a
//! new density value.

use std::f64::consts::TAU;

use df_core::{Error, Result};

/// A non-negative function on a closed, finite domain.
pub trait Density {
    /// Domain `(lo, hi)` with `lo < hi`.
    fn support(&self) -> (f64, f64);

    /// Unnormalized density at `x`. Expected to be `>= 0` on the support.
    fn value(&self, x: f64) -> f64;
}

/// Pseudorapidity shape `f(x) = 1 + a * x^2` on `[-half_range, half_range]`.
///
/// `a > 0` gives a dip at mid-rapidity, `a < 0` a bulge, `a = 0` a flat
/// distribution. Even in `x` for every `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaDensity {
    curvature: f64,
    half_range: f64,
}

impl EtaDensity {
    /// Create an eta density with curvature `a` over `[-half_range, half_range]`.
    pub fn new(curvature: f64, half_range: f64) -> Result<Self> {
        if !curvature.is_finite() {
            return Err(Error::Configuration(format!(
                "eta curvature must be finite, got {curvature}"
            )));
        }
        if !half_range.is_finite() || half_range <= 0.0 {
            return Err(Error::Configuration(format!(
                "eta range must be finite and > 0, got {half_range}"
            )));
        }
        Ok(Self { curvature, half_range })
    }

    /// Curvature coefficient `a`.
    pub fn curvature(&self) -> f64 {
        self.curvature
    }
}

impl Density for EtaDensity {
    fn support(&self) -> (f64, f64) {
        (-self.half_range, self.half_range)
    }

    #[inline]
    fn value(&self, x: f64) -> f64 {
        1.0 + self.curvature * x * x
    }
}

/// Azimuthal distribution with a first-harmonic asymmetry,
/// `f(phi) = 1 + 2 * v * cos(phi)` on `[0, 2*pi]`.
///
/// Non-negative as long as `|v| <= 0.5`. Under this density `E[cos(phi)] = v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiDensity {
    v: f64,
}

impl PhiDensity {
    /// Create an azimuthal density with first-harmonic coefficient `v`.
    #[inline]
    pub fn new(v: f64) -> Self {
        Self { v }
    }

    /// First-harmonic coefficient.
    pub fn v(&self) -> f64 {
        self.v
    }
}

impl Density for PhiDensity {
    fn support(&self) -> (f64, f64) {
        (0.0, TAU)
    }

    #[inline]
    fn value(&self, x: f64) -> f64 {
        1.0 + 2.0 * self.v * x.cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_eta_even() {
        let d = EtaDensity::new(0.074, 0.8).unwrap();
        for &x in &[0.1, 0.35, 0.8] {
            assert_relative_eq!(d.value(x), d.value(-x), epsilon = 1e-15);
        }
        assert_relative_eq!(d.value(0.0), 1.0);
        assert_eq!(d.support(), (-0.8, 0.8));
    }

    #[test]
    fn test_eta_invalid_range() {
        assert!(EtaDensity::new(0.05, 0.0).is_err());
        assert!(EtaDensity::new(0.05, -1.0).is_err());
        assert!(EtaDensity::new(f64::NAN, 0.8).is_err());
    }

    #[test]
    fn test_phi_extrema() {
        let d = PhiDensity::new(0.1);
        assert_relative_eq!(d.value(0.0), 1.2, epsilon = 1e-12);
        assert_relative_eq!(d.value(std::f64::consts::PI), 0.8, epsilon = 1e-12);
        let (lo, hi) = d.support();
        assert_eq!(lo, 0.0);
        assert_relative_eq!(hi, TAU);
    }
}

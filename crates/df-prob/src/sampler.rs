//! Numerical inverse-CDF sampling on a fixed grid.
//!
//! The density is evaluated on `npx` equally spaced nodes spanning the support,
//! integrated with the trapezoid rule and normalized to a table running from 0
//! to 1. A draw maps a uniform variate through the table and interpolates
//! linearly inside the bracketing interval. This avoids rejection envelopes and
//! works for any bounded shape, at the price of one table per parameter point.

use df_core::{Error, RandomSource, Result};

use crate::density::Density;

/// Default number of grid nodes.
pub const DEFAULT_NPX: usize = 50;

/// Normalized cumulative table of a density, ready for inverse sampling.
#[derive(Debug, Clone)]
pub struct TabulatedCdf {
    x_grid: Vec<f64>,
    cdf: Vec<f64>,
    /// Set when the integral vanished; every draw returns this value.
    collapsed: Option<f64>,
}

impl TabulatedCdf {
    /// Tabulate `density` on `npx` nodes (`npx >= 2`).
    ///
    /// Negative density values contribute zero area, so the table is always
    /// non-decreasing. A density that integrates to zero (or to a non-finite
    /// value) does not fail: the table collapses onto the midpoint of the
    /// support.
    pub fn build(density: &impl Density, npx: usize) -> Result<Self> {
        if npx < 2 {
            return Err(Error::Configuration(format!(
                "sampler resolution must be >= 2 nodes, got {npx}"
            )));
        }
        let (a, b) = density.support();
        if !a.is_finite() || !b.is_finite() || a >= b {
            return Err(Error::Configuration(format!(
                "sampler requires finite support with lo < hi, got ({a}, {b})"
            )));
        }

        let dx = (b - a) / (npx as f64 - 1.0);
        let mut x_grid = Vec::with_capacity(npx);
        let mut cdf = Vec::with_capacity(npx);

        let mut prev = density.value(a);
        x_grid.push(a);
        cdf.push(0.0);
        for i in 1..npx {
            let x = if i == npx - 1 { b } else { a + dx * i as f64 };
            let f = density.value(x);
            let area = 0.5 * (prev + f) * dx;
            let last = cdf[i - 1];
            cdf.push(last + if area > 0.0 { area } else { 0.0 });
            x_grid.push(x);
            prev = f;
        }

        let total = cdf[npx - 1];
        if !total.is_finite() || total <= 0.0 {
            let mid = 0.5 * (a + b);
            log::debug!("degenerate density table on [{a}, {b}] (integral={total}), using midpoint {mid}");
            return Ok(Self { x_grid, cdf, collapsed: Some(mid) });
        }
        for v in &mut cdf {
            *v /= total;
        }
        cdf[npx - 1] = 1.0;

        Ok(Self { x_grid, cdf, collapsed: None })
    }

    /// Domain `(lo, hi)` covered by the table.
    pub fn support(&self) -> (f64, f64) {
        (self.x_grid[0], self.x_grid[self.x_grid.len() - 1])
    }

    /// Normalized cumulative values at the grid nodes.
    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// Grid nodes.
    pub fn nodes(&self) -> &[f64] {
        &self.x_grid
    }

    /// Whether the density integrated to zero and the table collapsed.
    pub fn is_degenerate(&self) -> bool {
        self.collapsed.is_some()
    }

    /// Map a uniform variate `u in [0, 1)` to a domain value.
    pub fn quantile(&self, u: f64) -> f64 {
        if let Some(mid) = self.collapsed {
            return mid;
        }
        let n = self.cdf.len();
        let (lo, hi) = self.support();
        let idx = self.cdf.partition_point(|&v| v < u);
        let x = if idx == 0 {
            self.x_grid[0]
        } else if idx >= n {
            self.x_grid[n - 1]
        } else {
            let c0 = self.cdf[idx - 1];
            let c1 = self.cdf[idx];
            let x0 = self.x_grid[idx - 1];
            let x1 = self.x_grid[idx];
            if c1 > c0 { x0 + (u - c0) * (x1 - x0) / (c1 - c0) } else { 0.5 * (x0 + x1) }
        };
        x.clamp(lo, hi)
    }

    /// Draw one variate.
    #[inline]
    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> f64 {
        self.quantile(rng.uniform())
    }
}

//! Weighted linear least squares.
//!
//! Fits a model that is linear in its parameters, `y(x) = sum_k p_k * f_k(x)`,
//! to `(x, y, sigma)` points with weights `1 / sigma^2`. The normal equations
//! `(A^T W A) p = A^T W y` are solved directly; the covariance is the inverse
//! of the curvature matrix `A^T W A`. No iteration and no start values are
//! involved, so the fit cannot fail to converge: it either has enough usable
//! points and a regular curvature matrix, or it reports a [`FitFailure`].

use df_core::{FitFailure, FitResult};
use nalgebra::{DMatrix, DVector};

use crate::profile::FlowProfile;

/// Basis function of a linear model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    /// `f(x) = 1`
    Constant,
    /// `f(x) = x`
    Identity,
}

impl Basis {
    #[inline]
    fn eval(self, x: f64) -> f64 {
        match self {
            Basis::Constant => 1.0,
            Basis::Identity => x,
        }
    }
}

/// A model linear in its parameters, with one designated slope parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearModel {
    basis: Vec<Basis>,
    slope_index: usize,
}

impl LinearModel {
    /// `y = slope * x`
    pub fn proportional() -> Self {
        Self { basis: vec![Basis::Identity], slope_index: 0 }
    }

    /// `y = c + slope * x`
    pub fn with_intercept() -> Self {
        Self { basis: vec![Basis::Constant, Basis::Identity], slope_index: 1 }
    }

    /// Number of free parameters.
    pub fn n_params(&self) -> usize {
        self.basis.len()
    }

    /// Position of the slope in the parameter vector.
    pub fn slope_index(&self) -> usize {
        self.slope_index
    }

    /// Parameter names, in parameter order.
    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.basis
            .iter()
            .map(|b| match b {
                Basis::Constant => "intercept",
                Basis::Identity => "slope",
            })
            .collect()
    }

    /// Model value at `x` for `params`.
    pub fn eval(&self, x: f64, params: &[f64]) -> f64 {
        self.basis.iter().zip(params).map(|(b, p)| p * b.eval(x)).sum()
    }
}

/// Fit `model` to `(x, y, sigma)` points.
///
/// Points with a non-finite coordinate or a non-positive / non-finite sigma
/// carry no weight and are skipped.
pub fn fit_points(points: &[(f64, f64, f64)], model: &LinearModel) -> FitResult {
    let d = model.n_params();
    let usable: Vec<(f64, f64, f64)> = points
        .iter()
        .copied()
        .filter(|&(x, y, s)| x.is_finite() && y.is_finite() && s.is_finite() && s > 0.0)
        .collect();
    if usable.len() < d {
        return FitResult::failed(d, model.slope_index, FitFailure::InsufficientData);
    }

    // Accumulate A^T W A and A^T W y.
    let mut ata = vec![0.0; d * d];
    let mut aty = vec![0.0; d];
    let mut row = vec![0.0; d];
    for &(x, y, s) in &usable {
        let w = 1.0 / (s * s);
        for (k, b) in model.basis.iter().enumerate() {
            row[k] = b.eval(x);
        }
        for a in 0..d {
            aty[a] += w * row[a] * y;
            for b in 0..d {
                ata[a * d + b] += w * row[a] * row[b];
            }
        }
    }

    let a = DMatrix::from_row_slice(d, d, &ata);
    let b = DVector::from_vec(aty);
    let lu = a.lu();
    let (Some(sol), Some(cov)) = (lu.solve(&b), lu.try_inverse()) else {
        return FitResult::failed(d, model.slope_index, FitFailure::SingularCurvature);
    };

    let parameters: Vec<f64> = sol.iter().copied().collect();
    let mut uncertainties = Vec::with_capacity(d);
    for i in 0..d {
        let var = cov[(i, i)];
        if !var.is_finite() || var <= 0.0 {
            return FitResult::failed(d, model.slope_index, FitFailure::SingularCurvature);
        }
        uncertainties.push(var.sqrt());
    }
    if parameters.iter().any(|p| !p.is_finite()) {
        return FitResult::failed(d, model.slope_index, FitFailure::SingularCurvature);
    }

    let chi2 = usable
        .iter()
        .map(|&(x, y, s)| {
            let r = (y - model.eval(x, &parameters)) / s;
            r * r
        })
        .sum();

    // nalgebra is column-major; store the covariance row-major.
    let covariance: Vec<f64> = cov.transpose().iter().copied().collect();
    FitResult::with_covariance(
        parameters,
        uncertainties,
        covariance,
        chi2,
        usable.len() - d,
        model.slope_index,
    )
}

/// Fit `model` to the non-empty bins of `profile` (bin center, mean, error of the mean).
pub fn fit_profile(profile: &FlowProfile, model: &LinearModel) -> FitResult {
    let points: Vec<(f64, f64, f64)> = profile
        .points()
        .into_iter()
        .zip(profile.bins())
        .filter(|(_, bin)| bin.entries > 0)
        .map(|(p, _)| p)
        .collect();
    fit_points(&points, model)
}

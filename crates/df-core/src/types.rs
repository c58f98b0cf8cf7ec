//! Common data types for dflow

use serde::{Deserialize, Serialize};

/// Why a fit could not produce an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFailure {
    /// Fewer usable (non-empty, finite-error) points than free parameters.
    InsufficientData,
    /// The curvature matrix `A^T W A` could not be inverted.
    SingularCurvature,
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitFailure::InsufficientData => write!(f, "insufficient weighted data"),
            FitFailure::SingularCurvature => write!(f, "singular curvature matrix"),
        }
    }
}

/// Fit result containing parameter estimates and uncertainties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Best-fit parameter values
    pub parameters: Vec<f64>,

    /// Parameter uncertainties (sqrt of covariance diagonal)
    pub uncertainties: Vec<f64>,

    /// Covariance matrix (row-major, N×N). `None` if the fit failed.
    pub covariance: Option<Vec<f64>>,

    /// Weighted sum of squared residuals at the solution
    pub chi2: f64,

    /// Degrees of freedom (used points minus parameters)
    pub ndf: usize,

    /// Index of the slope parameter in `parameters`
    pub slope_index: usize,

    /// `Some` if the fit failed; parameters and uncertainties are then NaN
    pub failure: Option<FitFailure>,
}

impl FitResult {
    /// Create a successful fit result with covariance matrix
    pub fn with_covariance(
        parameters: Vec<f64>,
        uncertainties: Vec<f64>,
        covariance: Vec<f64>,
        chi2: f64,
        ndf: usize,
        slope_index: usize,
    ) -> Self {
        Self {
            parameters,
            uncertainties,
            covariance: Some(covariance),
            chi2,
            ndf,
            slope_index,
            failure: None,
        }
    }

    /// Create a failed fit result: every parameter and uncertainty is NaN.
    pub fn failed(n_params: usize, slope_index: usize, failure: FitFailure) -> Self {
        Self {
            parameters: vec![f64::NAN; n_params],
            uncertainties: vec![f64::NAN; n_params],
            covariance: None,
            chi2: f64::NAN,
            ndf: 0,
            slope_index,
            failure: Some(failure),
        }
    }

    /// Whether the fit produced an estimate.
    pub fn converged(&self) -> bool {
        self.failure.is_none()
    }

    /// Fitted slope (NaN on failure).
    pub fn slope(&self) -> f64 {
        self.parameters.get(self.slope_index).copied().unwrap_or(f64::NAN)
    }

    /// Standard error of the slope (NaN on failure).
    pub fn slope_error(&self) -> f64 {
        self.uncertainties.get(self.slope_index).copied().unwrap_or(f64::NAN)
    }

    /// Get correlation matrix element (i, j). Returns `None` if covariance is unavailable.
    pub fn correlation(&self, i: usize, j: usize) -> Option<f64> {
        let cov = self.covariance.as_ref()?;
        let n = self.parameters.len();
        if i >= n || j >= n {
            return None;
        }
        let sigma_i = self.uncertainties[i];
        let sigma_j = self.uncertainties[j];
        if sigma_i <= 0.0 || sigma_j <= 0.0 {
            return None;
        }
        Some(cov[i * n + j] / (sigma_i * sigma_j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_result() {
        let result = FitResult::with_covariance(
            vec![0.1, 0.02],
            vec![0.01, 0.004],
            vec![1e-4, 2e-5, 2e-5, 1.6e-5],
            3.2,
            4,
            1,
        );
        assert!(result.converged());
        assert_eq!(result.slope(), 0.02);
        assert_eq!(result.slope_error(), 0.004);
        let rho = result.correlation(0, 1).unwrap();
        assert_relative_eq!(rho, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_failed_is_nan() {
        let result = FitResult::failed(1, 0, FitFailure::InsufficientData);
        assert!(!result.converged());
        assert!(result.slope().is_nan());
        assert!(result.slope_error().is_nan());
        assert!(result.correlation(0, 0).is_none());
    }
}

//! Scan configuration.
//!
//! A [`ScanConfig`] is fixed before the scan starts and never mutated by the
//! driver. The centrality-dependent constants are not spread over the code:
//! they come from one lookup table indexed by `(variant, centrality)`, see
//! [`ScanConfig::coefficients`].
//!
//! Files are read as JSON when the extension is `.json` and as YAML otherwise.
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```yaml
//! centrality: 2          # 0 = 10-30%, 1 = 30-50%, 2 = 60-80%
//! variant: centrality    # or "flat"
//! v1: 0.0109
//! eta_range: 0.8
//! eta_bins: 6
//! steps: 10
//! multiplier: 200000
//! cycle_report: 2000
//! smearing_sigma: null   # radians; null = take it from the coefficient table
//! seed: 42
//! threads: 1
//! ```

use std::f64::consts::PI;
use std::path::Path;

use df_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Eta curvature per centrality class (10-30%, 30-50%, 60-80%).
const CENTRALITY_ETA_CURVATURE: [f64; 3] = [0.056, 0.061, 0.074];
/// Smearing width per centrality class, as a fraction of pi.
const CENTRALITY_SMEARING_FRACTION: [f64; 3] = [0.2, 0.2, 0.3];
/// Smearing width of the flat model, as a fraction of pi (pi/5).
const FLAT_SMEARING_FRACTION: f64 = 0.2;

/// Centrality class of the simulated collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Centrality {
    /// 10-30% (class 0).
    #[default]
    Central,
    /// 30-50% (class 1).
    MidCentral,
    /// 60-80% (class 2).
    Peripheral,
}

impl Centrality {
    /// Index into the coefficient table.
    pub fn index(self) -> usize {
        match self {
            Centrality::Central => 0,
            Centrality::MidCentral => 1,
            Centrality::Peripheral => 2,
        }
    }

    /// Human-readable centrality range.
    pub fn label(self) -> &'static str {
        match self {
            Centrality::Central => "10-30%",
            Centrality::MidCentral => "30-50%",
            Centrality::Peripheral => "60-80%",
        }
    }
}

impl TryFrom<u8> for Centrality {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Centrality::Central),
            1 => Ok(Centrality::MidCentral),
            2 => Ok(Centrality::Peripheral),
            other => {
                Err(Error::Configuration(format!("centrality class must be 0, 1 or 2, got {other}")))
            }
        }
    }
}

impl From<Centrality> for u8 {
    fn from(c: Centrality) -> u8 {
        c.index() as u8
    }
}

/// Which coefficient set the pipeline runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Centrality-dependent eta dip and smearing width.
    #[default]
    Centrality,
    /// Flat pseudorapidity and a fixed `pi/5` smearing width.
    Flat,
}

/// Model constants resolved for one configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Curvature `a` of the eta density `1 + a x^2`.
    pub eta_curvature: f64,
    /// Standard deviation of the angular smearing, radians.
    pub smearing_sigma: f64,
}

/// Immutable configuration of a sample-size scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Centrality class (0, 1 or 2).
    pub centrality: Centrality,
    /// Coefficient set.
    pub variant: ModelVariant,
    /// Injected directed-flow magnitude.
    pub v1: f64,
    /// Half-width of the pseudorapidity window, `[-eta_range, eta_range]`.
    pub eta_range: f64,
    /// Number of pseudorapidity bins per profile.
    pub eta_bins: usize,
    /// Number of sample-size steps.
    pub steps: usize,
    /// Sample size of step `i` is `(i + 1) * multiplier`.
    pub multiplier: u64,
    /// Progress is reported every `cycle_report` particles (0 = never).
    pub cycle_report: u64,
    /// Override of the smearing width in radians.
    pub smearing_sigma: Option<f64>,
    /// Sampler grid nodes for the eta density.
    pub eta_npx: usize,
    /// Sampler grid nodes for the azimuthal density.
    pub phi_npx: usize,
    /// Fit `c + slope * x` instead of `slope * x`.
    pub fit_intercept: bool,
    /// Base RNG seed.
    pub seed: u64,
    /// Threads (0 = auto). Results do not depend on it.
    pub threads: usize,
    /// Particles per independently seeded chunk.
    pub chunk_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            centrality: Centrality::Central,
            variant: ModelVariant::Centrality,
            v1: 0.0109,
            eta_range: 0.8,
            eta_bins: 6,
            steps: 10,
            multiplier: 200_000,
            cycle_report: 2000,
            smearing_sigma: None,
            eta_npx: df_prob::sampler::DEFAULT_NPX,
            phi_npx: df_prob::sampler::DEFAULT_NPX,
            fit_intercept: false,
            seed: 42,
            threads: 1,
            chunk_size: 10_000,
        }
    }
}

impl ScanConfig {
    /// Read a configuration file (JSON by extension, YAML otherwise).
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
        let cfg: ScanConfig = if ext == "json" {
            serde_json::from_slice(&bytes)?
        } else {
            serde_yaml_ng::from_slice(&bytes)?
        };
        Ok(cfg)
    }

    /// Check every field. Called by the driver before any sampling.
    pub fn validate(&self) -> Result<()> {
        if self.eta_bins == 0 {
            return Err(Error::Configuration("eta_bins must be > 0".to_string()));
        }
        if !self.eta_range.is_finite() || self.eta_range <= 0.0 {
            return Err(Error::Configuration(format!(
                "eta_range must be finite and > 0, got {}",
                self.eta_range
            )));
        }
        if self.steps == 0 {
            return Err(Error::Configuration("steps must be > 0".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be > 0".to_string()));
        }
        if self.eta_npx < 2 || self.phi_npx < 2 {
            return Err(Error::Configuration(format!(
                "sampler resolution must be >= 2 nodes, got eta_npx={}, phi_npx={}",
                self.eta_npx, self.phi_npx
            )));
        }
        if !self.v1.is_finite() {
            return Err(Error::Configuration(format!("v1 must be finite, got {}", self.v1)));
        }
        // Largest azimuthal coefficient is |v1| * eta_range; 1 + 2v cos(phi) must stay >= 0.
        if 2.0 * self.v1.abs() * self.eta_range > 1.0 {
            return Err(Error::Configuration(format!(
                "2 * |v1| * eta_range must be <= 1 for a non-negative azimuthal density, got {}",
                2.0 * self.v1.abs() * self.eta_range
            )));
        }
        if let Some(sigma) = self.smearing_sigma {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(Error::Configuration(format!(
                    "smearing_sigma must be finite and >= 0, got {sigma}"
                )));
            }
        }
        if (self.steps as u64).checked_mul(self.multiplier).is_none() {
            return Err(Error::Configuration(format!(
                "steps * multiplier overflows: {} * {}",
                self.steps, self.multiplier
            )));
        }
        Ok(())
    }

    /// Model constants for this configuration, with the smearing override applied.
    pub fn coefficients(&self) -> Coefficients {
        let i = self.centrality.index();
        let (eta_curvature, fraction) = match self.variant {
            ModelVariant::Centrality => {
                (CENTRALITY_ETA_CURVATURE[i], CENTRALITY_SMEARING_FRACTION[i])
            }
            ModelVariant::Flat => (0.0, FLAT_SMEARING_FRACTION),
        };
        Coefficients {
            eta_curvature,
            smearing_sigma: self.smearing_sigma.unwrap_or(fraction * PI),
        }
    }

    /// Attenuation of `<cos(phi + delta)>` by Gaussian smearing, `exp(-sigma^2 / 2)`.
    pub fn resolution_factor(&self) -> f64 {
        let sigma = self.coefficients().smearing_sigma;
        (-0.5 * sigma * sigma).exp()
    }

    /// The v1 a perfect fit would report: the target times the resolution factor.
    pub fn expected_observed_v1(&self) -> f64 {
        self.v1 * self.resolution_factor()
    }

    /// Number of particles generated at `step` (0-based).
    pub fn sample_size(&self, step: usize) -> u64 {
        (step as u64 + 1).saturating_mul(self.multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = ScanConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.sample_size(0), 200_000);
        assert_eq!(cfg.sample_size(9), 2_000_000);
    }

    #[test]
    fn test_coefficient_table() {
        let mut cfg = ScanConfig::default();
        let c0 = cfg.coefficients();
        assert_relative_eq!(c0.eta_curvature, 0.056);
        assert_relative_eq!(c0.smearing_sigma, 0.2 * PI);

        cfg.centrality = Centrality::MidCentral;
        assert_relative_eq!(cfg.coefficients().eta_curvature, 0.061);

        cfg.centrality = Centrality::Peripheral;
        let c2 = cfg.coefficients();
        assert_relative_eq!(c2.eta_curvature, 0.074);
        assert_relative_eq!(c2.smearing_sigma, 0.3 * PI);

        cfg.variant = ModelVariant::Flat;
        let flat = cfg.coefficients();
        assert_eq!(flat.eta_curvature, 0.0);
        assert_relative_eq!(flat.smearing_sigma, PI / 5.0);
    }

    #[test]
    fn test_smearing_override() {
        let cfg = ScanConfig { smearing_sigma: Some(0.0), ..ScanConfig::default() };
        assert_eq!(cfg.coefficients().smearing_sigma, 0.0);
        assert_eq!(cfg.resolution_factor(), 1.0);
        assert_eq!(cfg.expected_observed_v1(), cfg.v1);
    }

    #[test]
    fn test_resolution_factor() {
        let cfg = ScanConfig::default();
        let sigma = 0.2 * PI;
        assert_relative_eq!(cfg.resolution_factor(), (-0.5 * sigma * sigma).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_configurations() {
        let base = ScanConfig::default();
        let bad = [
            ScanConfig { eta_bins: 0, ..base.clone() },
            ScanConfig { eta_range: 0.0, ..base.clone() },
            ScanConfig { eta_range: f64::NAN, ..base.clone() },
            ScanConfig { steps: 0, ..base.clone() },
            ScanConfig { chunk_size: 0, ..base.clone() },
            ScanConfig { phi_npx: 1, ..base.clone() },
            ScanConfig { v1: f64::INFINITY, ..base.clone() },
            ScanConfig { v1: 0.7, ..base.clone() },
            ScanConfig { smearing_sigma: Some(-0.1), ..base.clone() },
        ];
        for cfg in bad {
            let err = cfg.validate().unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "unexpected error: {err}");
        }
    }

    #[test]
    fn test_zero_multiplier_is_valid() {
        let cfg = ScanConfig { multiplier: 0, ..ScanConfig::default() };
        cfg.validate().unwrap();
        assert_eq!(cfg.sample_size(3), 0);
    }

    #[test]
    fn test_json_partial_document() {
        let cfg: ScanConfig =
            serde_json::from_str(r#"{"centrality": 2, "variant": "flat", "v1": 0.05}"#).unwrap();
        assert_eq!(cfg.centrality, Centrality::Peripheral);
        assert_eq!(cfg.variant, ModelVariant::Flat);
        assert_eq!(cfg.eta_bins, 6);
        assert_eq!(cfg.v1, 0.05);
    }

    #[test]
    fn test_yaml_and_bad_centrality() {
        let cfg: ScanConfig = serde_yaml_ng::from_str("centrality: 1\nsteps: 3\n").unwrap();
        assert_eq!(cfg.centrality, Centrality::MidCentral);
        assert_eq!(cfg.steps, 3);

        assert!(serde_json::from_str::<ScanConfig>(r#"{"centrality": 3}"#).is_err());
        assert!(serde_json::from_str::<ScanConfig>(r#"{"etaBins": 3}"#).is_err());
    }

    #[test]
    fn test_centrality_round_trip_through_u8() {
        for c in [Centrality::Central, Centrality::MidCentral, Centrality::Peripheral] {
            assert_eq!(Centrality::try_from(u8::from(c)).unwrap(), c);
        }
        assert_eq!(Centrality::Peripheral.label(), "60-80%");
    }
}

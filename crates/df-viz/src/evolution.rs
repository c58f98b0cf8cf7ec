use df_inference::{EnsembleSummary, ScanResult};
use serde::{Deserialize, Serialize};

/// Plot-friendly artifact for one sample-size scan.
///
/// Failed steps keep their slot; their values are NaN and serialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionArtifact {
    /// Injected v1.
    pub target_v1: f64,
    /// Injected v1 times the resolution factor.
    pub expected_v1: f64,
    /// Sample size per step.
    pub sample_sizes: Vec<u64>,
    /// Combined v1 per step.
    pub v1: Vec<f64>,
    /// v1 standard error per step.
    pub v1_errors: Vec<f64>,
    /// Significance over dispersion per step.
    pub sod: Vec<f64>,
    /// Fit-failure flag per step.
    pub fit_failed: Vec<bool>,
    /// Per-step positive-charge slope.
    pub v1_pos: Vec<f64>,
    /// Per-step negative-charge slope.
    pub v1_neg: Vec<f64>,
}

impl From<ScanResult> for EvolutionArtifact {
    fn from(scan: ScanResult) -> Self {
        let n = scan.points.len();
        let mut sample_sizes = Vec::with_capacity(n);
        let mut v1 = Vec::with_capacity(n);
        let mut v1_errors = Vec::with_capacity(n);
        let mut sod = Vec::with_capacity(n);
        let mut fit_failed = Vec::with_capacity(n);

        for p in &scan.points {
            sample_sizes.push(p.sample_size);
            v1.push(p.v1);
            v1_errors.push(p.v1_error);
            sod.push(p.sod);
            fit_failed.push(p.fit_failed);
        }
        let v1_pos = scan.steps.iter().map(|s| s.fit_pos.slope()).collect();
        let v1_neg = scan.steps.iter().map(|s| s.fit_neg.slope()).collect();

        Self {
            target_v1: scan.target_v1,
            expected_v1: scan.expected_v1,
            sample_sizes,
            v1,
            v1_errors,
            sod,
            fit_failed,
            v1_pos,
            v1_neg,
        }
    }
}

/// Plot-friendly artifact for an ensemble of scans (mean and spread bands).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleArtifact {
    /// Number of runs.
    pub n_runs: usize,
    /// Expected observed v1.
    pub expected_v1: f64,
    /// Sample size per step.
    pub sample_sizes: Vec<u64>,
    /// Mean v1 per step.
    pub mean_v1: Vec<f64>,
    /// Standard deviation of v1 per step.
    pub std_v1: Vec<f64>,
    /// Mean SoD per step.
    pub mean_sod: Vec<f64>,
    /// Standard deviation of SoD per step.
    pub std_sod: Vec<f64>,
    /// One-sigma coverage per step.
    pub coverage_1sigma: Vec<f64>,
    /// Two-sigma coverage per step.
    pub coverage_2sigma: Vec<f64>,
    /// Failed runs per step.
    pub n_failed: Vec<usize>,
}

impl From<EnsembleSummary> for EnsembleArtifact {
    fn from(summary: EnsembleSummary) -> Self {
        let steps = &summary.steps;
        Self {
            n_runs: summary.n_runs,
            expected_v1: summary.expected_v1,
            sample_sizes: steps.iter().map(|s| s.sample_size).collect(),
            mean_v1: steps.iter().map(|s| s.mean_v1).collect(),
            std_v1: steps.iter().map(|s| s.std_v1).collect(),
            mean_sod: steps.iter().map(|s| s.mean_sod).collect(),
            std_sod: steps.iter().map(|s| s.std_sod).collect(),
            coverage_1sigma: steps.iter().map(|s| s.coverage_1sigma).collect(),
            coverage_2sigma: steps.iter().map(|s| s.coverage_2sigma).collect(),
            n_failed: steps.iter().map(|s| s.n_failed).collect(),
        }
    }
}

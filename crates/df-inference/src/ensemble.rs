//! Repeated scans with consecutive seeds.
//!
//! Run `r` uses `seed + r`. Runs are independent and execute in parallel; each
//! run is itself sequential, so the ensemble is reproducible for any thread
//! count. Per step, the ensemble reports the spread of the v1 estimates and
//! how often the quoted error covers the expected observed v1.

use df_core::{Error, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::ScanConfig;
use crate::report::NullReporter;
use crate::scan::{ScanDriver, ScanPoint};

/// Ensemble statistics for one step.
#[derive(Debug, Clone, Serialize)]
pub struct EnsembleStep {
    /// 0-based step index.
    pub step: usize,
    /// Particles per run at this step.
    pub sample_size: u64,
    /// Runs with usable fits.
    pub n_ok: usize,
    /// Runs whose fits failed.
    pub n_failed: usize,
    /// Mean v1 over usable runs.
    pub mean_v1: f64,
    /// Sample standard deviation of v1.
    pub std_v1: f64,
    /// Mean quoted v1 error.
    pub mean_v1_error: f64,
    /// Mean SoD.
    pub mean_sod: f64,
    /// Sample standard deviation of SoD.
    pub std_sod: f64,
    /// Fraction of usable runs with `|v1 - expected| <= v1_error`.
    pub coverage_1sigma: f64,
    /// Fraction of usable runs with `|v1 - expected| <= 2 * v1_error`.
    pub coverage_2sigma: f64,
}

/// Result of [`run_ensemble`].
#[derive(Debug, Clone, Serialize)]
pub struct EnsembleSummary {
    /// Number of runs.
    pub n_runs: usize,
    /// Expected observed v1 (injected v1 times the resolution factor).
    pub expected_v1: f64,
    /// Per-step statistics.
    pub steps: Vec<EnsembleStep>,
    /// Per-run scan points, `runs[r][step]`.
    pub runs: Vec<Vec<ScanPoint>>,
    /// Total wall time in seconds.
    pub wall_s: f64,
}

/// Run `n_runs` scans of `config` with seeds `seed, seed + 1, ...`.
///
/// `threads`: 0 uses the global Rayon pool, otherwise a dedicated pool of that size.
pub fn run_ensemble(config: &ScanConfig, n_runs: usize, threads: usize) -> Result<EnsembleSummary> {
    if n_runs == 0 {
        return Err(Error::Configuration("n_runs must be > 0".into()));
    }
    config.validate()?;
    let start = std::time::Instant::now();

    let run_scans = || -> Result<Vec<Vec<ScanPoint>>> {
        (0..n_runs)
            .into_par_iter()
            .map(|r| {
                let run_config = ScanConfig {
                    seed: config.seed.wrapping_add(r as u64),
                    threads: 1,
                    ..config.clone()
                };
                let result = ScanDriver::new(run_config)?.run(&mut NullReporter)?;
                Ok(result.points)
            })
            .collect()
    };

    let runs = if threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?;
        pool.install(run_scans)?
    } else {
        run_scans()?
    };

    let expected_v1 = config.expected_observed_v1();
    let steps = (0..config.steps)
        .map(|step| {
            let points: Vec<ScanPoint> = runs.iter().map(|run| run[step]).collect();
            step_summary(step, config.sample_size(step), &points, expected_v1)
        })
        .collect();

    log::debug!("ensemble: {n_runs} runs done in {:.3}s", start.elapsed().as_secs_f64());

    Ok(EnsembleSummary { n_runs, expected_v1, steps, runs, wall_s: start.elapsed().as_secs_f64() })
}

fn step_summary(step: usize, sample_size: u64, points: &[ScanPoint], expected: f64) -> EnsembleStep {
    let ok: Vec<&ScanPoint> = points.iter().filter(|p| !p.fit_failed).collect();
    let v1: Vec<f64> = ok.iter().map(|p| p.v1).collect();
    let err: Vec<f64> = ok.iter().map(|p| p.v1_error).collect();
    let sod: Vec<f64> = ok.iter().map(|p| p.sod).collect();

    let covered = |k: f64| {
        if ok.is_empty() {
            return f64::NAN;
        }
        let n = ok.iter().filter(|p| (p.v1 - expected).abs() <= k * p.v1_error).count();
        n as f64 / ok.len() as f64
    };

    EnsembleStep {
        step,
        sample_size,
        n_ok: ok.len(),
        n_failed: points.len() - ok.len(),
        mean_v1: mean(&v1),
        std_v1: std_dev(&v1),
        mean_v1_error: mean(&err),
        mean_sod: mean(&sod),
        std_sod: std_dev(&sod),
        coverage_1sigma: covered(1.0),
        coverage_2sigma: covered(2.0),
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    (ss / (xs.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(v1: f64, v1_error: f64) -> ScanPoint {
        ScanPoint { sample_size: 100, v1, v1_error, sod: v1 / v1_error, fit_failed: false }
    }

    #[test]
    fn test_step_summary() {
        let failed = ScanPoint {
            sample_size: 100,
            v1: f64::NAN,
            v1_error: f64::NAN,
            sod: f64::NAN,
            fit_failed: true,
        };
        let pts = [point(0.010, 0.002), point(0.013, 0.002), point(0.016, 0.002), failed];
        let s = step_summary(0, 100, &pts, 0.010);
        assert_eq!(s.n_ok, 3);
        assert_eq!(s.n_failed, 1);
        assert_relative_eq!(s.mean_v1, 0.013, epsilon = 1e-15);
        assert_relative_eq!(s.std_v1, 0.003, epsilon = 1e-12);
        assert_relative_eq!(s.mean_v1_error, 0.002, epsilon = 1e-15);
        // |dv| = 0, 0.003, 0.006 against 0.002 and 0.004.
        assert_relative_eq!(s.coverage_1sigma, 1.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(s.coverage_2sigma, 2.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_all_failed_is_nan() {
        let failed = ScanPoint {
            sample_size: 0,
            v1: f64::NAN,
            v1_error: f64::NAN,
            sod: f64::NAN,
            fit_failed: true,
        };
        let s = step_summary(0, 0, &[failed, failed], 0.01);
        assert_eq!(s.n_ok, 0);
        assert!(s.mean_v1.is_nan());
        assert!(s.coverage_1sigma.is_nan());
    }

    #[test]
    fn test_zero_runs_rejected() {
        let cfg = ScanConfig::default();
        assert!(matches!(run_ensemble(&cfg, 0, 1), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_small_ensemble_shape() {
        let cfg = ScanConfig { steps: 2, multiplier: 2000, chunk_size: 1000, ..ScanConfig::default() };
        let s = run_ensemble(&cfg, 3, 2).unwrap();
        assert_eq!(s.n_runs, 3);
        assert_eq!(s.runs.len(), 3);
        assert_eq!(s.steps.len(), 2);
        assert_eq!(s.steps[1].sample_size, 4000);
        assert_eq!(s.steps[0].n_ok + s.steps[0].n_failed, 3);
        // Distinct seeds give distinct estimates.
        assert_ne!(s.runs[0][0].v1, s.runs[1][0].v1);
    }
}

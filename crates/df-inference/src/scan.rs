//! Sample-size scan driver.
//!
//! For steps `i = 0..steps`, the driver generates `(i + 1) * multiplier`
//! particles, fills fresh per-charge profiles, fits both profiles and combines
//! the two slopes into one v1 estimate and its significance over dispersion
//! (SoD). Steps run strictly one after another.
//!
//! Within a step, particles are produced in fixed-size chunks, each with its
//! own RNG seeded from `(seed, step, chunk)`. Chunks may run on a Rayon pool;
//! their partial profiles are merged in chunk order, so the result does not
//! depend on the number of threads.

use df_core::{Error, FitResult, Result};
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::ScanConfig;
use crate::linear_fit::{LinearModel, fit_profile};
use crate::particle::{Charge, ParticleGenerator};
use crate::profile::FlowAccumulator;
use crate::report::ScanReporter;

/// One step of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanPoint {
    /// Number of generated particles.
    pub sample_size: u64,
    /// Combined v1, `(v1_pos - v1_neg) / 2`.
    pub v1: f64,
    /// `sqrt(err_pos^2 + err_neg^2) / 2`.
    pub v1_error: f64,
    /// Significance over dispersion, `v1 / v1_error`.
    pub sod: f64,
    /// Set when either profile fit failed; the numeric fields are then NaN.
    pub fit_failed: bool,
}

impl ScanPoint {
    /// Combine the positive- and negative-charge fits.
    pub fn combine(sample_size: u64, fit_pos: &FitResult, fit_neg: &FitResult) -> Self {
        if !fit_pos.converged() || !fit_neg.converged() {
            return Self {
                sample_size,
                v1: f64::NAN,
                v1_error: f64::NAN,
                sod: f64::NAN,
                fit_failed: true,
            };
        }
        let (v1_pos, err_pos) = (fit_pos.slope(), fit_pos.slope_error());
        let (v1_neg, err_neg) = (fit_neg.slope(), fit_neg.slope_error());
        let v1 = (v1_pos - v1_neg) / 2.0;
        let v1_error = (err_pos * err_pos + err_neg * err_neg).sqrt() / 2.0;
        Self { sample_size, v1, v1_error, sod: v1 / v1_error, fit_failed: false }
    }
}

/// Graph point with a y error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorPoint {
    /// Sample size.
    pub x: f64,
    /// Value.
    pub y: f64,
    /// Error on the value.
    pub ey: f64,
}

/// Graph point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphPoint {
    /// Sample size.
    pub x: f64,
    /// Value.
    pub y: f64,
}

/// Everything known about a finished step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 0-based step index.
    pub step: usize,
    /// Number of generated particles.
    pub sample_size: u64,
    /// Entries in the positive-charge profile.
    pub n_pos: u64,
    /// Entries in the negative-charge profile.
    pub n_neg: u64,
    /// Fit of the positive-charge profile.
    pub fit_pos: FitResult,
    /// Fit of the negative-charge profile.
    pub fit_neg: FitResult,
    /// Combined result.
    pub point: ScanPoint,
}

/// Completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Injected v1.
    pub target_v1: f64,
    /// Injected v1 times the smearing resolution factor.
    pub expected_v1: f64,
    /// One point per step, in step order.
    pub points: Vec<ScanPoint>,
    /// v1 versus sample size.
    pub v1_vs_n: Vec<ErrorPoint>,
    /// SoD versus sample size.
    pub sod_vs_n: Vec<GraphPoint>,
    /// Per-step details.
    pub steps: Vec<StepReport>,
    /// Total wall time in seconds.
    pub wall_s: f64,
}

impl ScanResult {
    fn for_config(config: &ScanConfig) -> Self {
        let n = config.steps;
        Self {
            target_v1: config.v1,
            expected_v1: config.expected_observed_v1(),
            points: Vec::with_capacity(n),
            v1_vs_n: Vec::with_capacity(n),
            sod_vs_n: Vec::with_capacity(n),
            steps: Vec::with_capacity(n),
            wall_s: 0.0,
        }
    }

    fn push(&mut self, report: StepReport) {
        let p = report.point;
        let x = p.sample_size as f64;
        self.points.push(p);
        self.v1_vs_n.push(ErrorPoint { x, y: p.v1, ey: p.v1_error });
        self.sod_vs_n.push(GraphPoint { x, y: p.sod });
        self.steps.push(report);
    }

    /// Number of steps whose fits failed.
    pub fn n_failed(&self) -> usize {
        self.points.iter().filter(|p| p.fit_failed).count()
    }
}

/// Orchestrates a sample-size scan for one immutable configuration.
pub struct ScanDriver {
    config: ScanConfig,
    generator: ParticleGenerator,
    smearing_sigma: f64,
    model: LinearModel,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for ScanDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanDriver")
            .field("config", &self.config)
            .field("smearing_sigma", &self.smearing_sigma)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl ScanDriver {
    /// Validate `config` and prepare the generator. Nothing is sampled here.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let generator = ParticleGenerator::from_config(&config)?;
        let smearing_sigma = config.coefficients().smearing_sigma;
        let model =
            if config.fit_intercept { LinearModel::with_intercept() } else { LinearModel::proportional() };

        let pool = if config.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .build()
                    .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?,
            )
        } else {
            None
        };

        Ok(Self {
            config,
            generator,
            smearing_sigma,
            model,
            pool,
        })
    }

    /// The configuration this driver runs.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run every step and hand the completed series to `reporter`.
    pub fn run(&self, reporter: &mut dyn ScanReporter) -> Result<ScanResult> {
        let start = std::time::Instant::now();
        log::debug!(
            "scan: {} steps x {} particles, centrality {}, v1={}",
            self.config.steps,
            self.config.multiplier,
            self.config.centrality.label(),
            self.config.v1
        );

        let mut result = ScanResult::for_config(&self.config);
        for step in 0..self.config.steps {
            let report = self.run_step(step, reporter)?;
            result.push(report);
        }
        result.wall_s = start.elapsed().as_secs_f64();

        reporter.scan_finished(&result);
        Ok(result)
    }

    /// Run a single step (0-based) with fresh profiles.
    pub fn run_step(&self, step: usize, reporter: &mut dyn ScanReporter) -> Result<StepReport> {
        let sample_size = self.config.sample_size(step);
        reporter.step_started(step, sample_size);

        let acc = self.accumulate(step, sample_size, reporter)?;
        let (pos, neg) = acc.into_profiles();

        let fit_pos = fit_profile(&pos, &self.model);
        let fit_neg = fit_profile(&neg, &self.model);
        for (charge, fit) in [(Charge::Positive, &fit_pos), (Charge::Negative, &fit_neg)] {
            if let Some(reason) = fit.failure {
                log::warn!("step {step} (N={sample_size}): {charge:?} profile fit failed: {reason}");
            }
        }

        let point = ScanPoint::combine(sample_size, &fit_pos, &fit_neg);
        let report = StepReport {
            step,
            sample_size,
            n_pos: pos.entries(),
            n_neg: neg.entries(),
            fit_pos,
            fit_neg,
            point,
        };
        reporter.step_finished(&report);
        Ok(report)
    }

    fn fresh_accumulator(&self) -> Result<FlowAccumulator> {
        FlowAccumulator::new(self.config.eta_bins, self.config.eta_range, self.smearing_sigma)
    }

    fn fill_chunk(&self, step: usize, chunk: usize, len: u64) -> Result<FlowAccumulator> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(chunk_seed(self.config.seed, step, chunk));
        let mut acc = self.fresh_accumulator()?;
        for _ in 0..len {
            let particle = self.generator.generate(&mut rng)?;
            acc.fill(&particle, &mut rng);
        }
        Ok(acc)
    }

    fn accumulate(
        &self,
        step: usize,
        sample_size: u64,
        reporter: &mut dyn ScanReporter,
    ) -> Result<FlowAccumulator> {
        let chunk_size = self.config.chunk_size as u64;
        let n_chunks = sample_size.div_ceil(chunk_size) as usize;
        let chunk_len = |c: usize| chunk_size.min(sample_size - c as u64 * chunk_size);

        let mut total = self.fresh_accumulator()?;
        let mut progress = Progress::new(self.config.cycle_report);

        if self.config.threads == 1 {
            for c in 0..n_chunks {
                let part = self.fill_chunk(step, c, chunk_len(c))?;
                total.merge(&part)?;
                progress.advance(step, c as u64 * chunk_size + chunk_len(c), reporter);
            }
            return Ok(total);
        }

        // Chunks run in waves of one chunk per worker; each wave is merged in
        // chunk order and reported before the next one starts.
        let wave = match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
        .max(1);
        let mut first = 0;
        while first < n_chunks {
            let last = (first + wave).min(n_chunks);
            let run_wave = || -> Result<Vec<FlowAccumulator>> {
                (first..last).into_par_iter().map(|c| self.fill_chunk(step, c, chunk_len(c))).collect()
            };
            let parts = match &self.pool {
                Some(pool) => pool.install(run_wave)?,
                None => run_wave()?,
            };
            for (c, part) in (first..last).zip(&parts) {
                total.merge(part)?;
                progress.advance(step, c as u64 * chunk_size + chunk_len(c), reporter);
            }
            first = last;
        }
        Ok(total)
    }
}

/// Emits a progress event for every multiple of `cycle` below the processed count.
struct Progress {
    cycle: u64,
    next: u64,
}

impl Progress {
    fn new(cycle: u64) -> Self {
        Self { cycle, next: 0 }
    }

    fn advance(&mut self, step: usize, processed: u64, reporter: &mut dyn ScanReporter) {
        if self.cycle == 0 {
            return;
        }
        while self.next < processed {
            reporter.progress(step, self.next);
            self.next += self.cycle;
        }
    }
}

#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// RNG seed of one chunk. Nearby base seeds (as used by ensembles, `seed + run`)
/// yield unrelated chunk streams.
pub fn chunk_seed(seed: u64, step: usize, chunk: usize) -> u64 {
    let s = mix64(seed ^ mix64((step as u64).wrapping_add(0x9E37_79B9_7F4A_7C15)));
    mix64(s.wrapping_add(chunk as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReporter;
    use df_core::FitFailure;

    fn small_config() -> ScanConfig {
        ScanConfig {
            v1: 0.05,
            steps: 3,
            multiplier: 3000,
            chunk_size: 1000,
            cycle_report: 1000,
            ..ScanConfig::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<(usize, u64)>,
        progress: Vec<(usize, u64)>,
        finished: Vec<usize>,
        scans: usize,
    }

    impl ScanReporter for Recorder {
        fn step_started(&mut self, step: usize, sample_size: u64) {
            self.started.push((step, sample_size));
        }
        fn progress(&mut self, step: usize, processed: u64) {
            self.progress.push((step, processed));
        }
        fn step_finished(&mut self, report: &StepReport) {
            self.finished.push(report.step);
        }
        fn scan_finished(&mut self, _result: &ScanResult) {
            self.scans += 1;
        }
    }

    #[test]
    fn test_combine() {
        let pos = FitResult::with_covariance(vec![0.03], vec![0.004], vec![1.6e-5], 1.0, 5, 0);
        let neg = FitResult::with_covariance(vec![-0.05], vec![0.003], vec![9e-6], 1.0, 5, 0);
        let p = ScanPoint::combine(1000, &pos, &neg);
        assert!(!p.fit_failed);
        assert!((p.v1 - 0.04).abs() < 1e-15);
        assert!((p.v1_error - 0.0025).abs() < 1e-15);
        assert!((p.sod - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_combine_failure_is_nan() {
        let ok = FitResult::with_covariance(vec![0.03], vec![0.004], vec![1.6e-5], 1.0, 5, 0);
        let bad = FitResult::failed(1, 0, FitFailure::InsufficientData);
        let p = ScanPoint::combine(10, &ok, &bad);
        assert!(p.fit_failed);
        assert!(p.v1.is_nan() && p.v1_error.is_nan() && p.sod.is_nan());
    }

    #[test]
    fn test_series_shape_and_sample_sizes() {
        let driver = ScanDriver::new(small_config()).unwrap();
        let result = driver.run(&mut NullReporter).unwrap();
        assert_eq!(result.points.len(), 3);
        assert_eq!(result.v1_vs_n.len(), 3);
        assert_eq!(result.sod_vs_n.len(), 3);
        let sizes: Vec<u64> = result.points.iter().map(|p| p.sample_size).collect();
        assert_eq!(sizes, vec![3000, 6000, 9000]);
        for (s, p) in result.steps.iter().zip(&result.points) {
            assert_eq!(s.n_pos + s.n_neg, p.sample_size);
            assert!(!p.fit_failed);
            assert!(p.v1_error > 0.0);
        }
    }

    #[test]
    fn test_reporter_events() {
        let driver = ScanDriver::new(small_config()).unwrap();
        let mut rec = Recorder::default();
        driver.run(&mut rec).unwrap();
        assert_eq!(rec.started, vec![(0, 3000), (1, 6000), (2, 9000)]);
        assert_eq!(rec.finished, vec![0, 1, 2]);
        assert_eq!(rec.scans, 1);
        let step1: Vec<u64> = rec.progress.iter().filter(|(s, _)| *s == 1).map(|&(_, j)| j).collect();
        assert_eq!(step1, vec![0, 1000, 2000, 3000, 4000, 5000]);
    }

    #[test]
    fn test_parallel_progress_matches_sequential() {
        // 7 chunks per step: several waves on a 2-thread pool, one partial.
        let cfg = |threads| ScanConfig {
            steps: 2,
            multiplier: 3_300,
            chunk_size: 1_000,
            cycle_report: 500,
            threads,
            ..small_config()
        };
        let mut seq = Recorder::default();
        ScanDriver::new(cfg(1)).unwrap().run(&mut seq).unwrap();
        for threads in [0, 2] {
            let mut par = Recorder::default();
            ScanDriver::new(cfg(threads)).unwrap().run(&mut par).unwrap();
            assert_eq!(par.progress, seq.progress, "threads={threads}");
        }
        let step1 = seq.progress.iter().filter(|(s, _)| *s == 1).count();
        assert_eq!(step1, 14);
    }

    #[test]
    fn test_progress_disabled() {
        let cfg = ScanConfig { cycle_report: 0, steps: 1, ..small_config() };
        let mut rec = Recorder::default();
        ScanDriver::new(cfg).unwrap().run(&mut rec).unwrap();
        assert!(rec.progress.is_empty());
    }

    #[test]
    fn test_uneven_last_chunk() {
        let cfg = ScanConfig { multiplier: 2500, steps: 1, ..small_config() };
        let result = ScanDriver::new(cfg).unwrap().run(&mut NullReporter).unwrap();
        let s = &result.steps[0];
        assert_eq!(s.n_pos + s.n_neg, 2500);
    }

    #[test]
    fn test_zero_sample_size_tags_failure() {
        let cfg = ScanConfig { multiplier: 0, ..small_config() };
        let result = ScanDriver::new(cfg).unwrap().run(&mut NullReporter).unwrap();
        assert_eq!(result.n_failed(), 3);
        for p in &result.points {
            assert!(p.fit_failed);
            assert!(p.v1.is_nan() && p.v1_error.is_nan() && p.sod.is_nan());
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_sampling() {
        let cfg = ScanConfig { eta_bins: 0, ..small_config() };
        assert!(matches!(ScanDriver::new(cfg), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_chunk_seeds_distinct() {
        let mut seen = std::collections::HashSet::new();
        for run in 0..20u64 {
            for step in 0..10 {
                for chunk in 0..20 {
                    assert!(seen.insert(chunk_seed(42 + run, step, chunk)));
                }
            }
        }
    }
}

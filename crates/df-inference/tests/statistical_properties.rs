//! Statistical behaviour of the full pipeline.
//!
//! Every check uses fixed seeds; coverage thresholds are the nominal rates
//! (90% two-sigma for a null signal, 68% one-sigma for an injected one).

use df_inference::{Centrality, ModelVariant, ScanConfig, run_ensemble};

#[test]
fn test_null_signal_is_consistent_with_zero() {
    let cfg = ScanConfig {
        v1: 0.0,
        steps: 1,
        multiplier: 10_000,
        seed: 7,
        ..ScanConfig::default()
    };
    let s = run_ensemble(&cfg, 40, 0).unwrap();
    let step = &s.steps[0];
    assert_eq!(step.n_failed, 0);
    assert!(step.coverage_2sigma >= 0.9, "coverage_2sigma={}", step.coverage_2sigma);
    assert!(step.mean_v1.abs() < 3.0 * step.mean_v1_error / (40f64).sqrt() + 1e-3);
}

#[test]
fn test_injected_signal_is_recovered_without_smearing() {
    let cfg = ScanConfig {
        v1: 0.05,
        steps: 1,
        multiplier: 20_000,
        smearing_sigma: Some(0.0),
        seed: 99,
        ..ScanConfig::default()
    };
    let s = run_ensemble(&cfg, 30, 0).unwrap();
    assert_eq!(s.expected_v1, 0.05);
    let step = &s.steps[0];
    assert!(step.coverage_1sigma >= 0.68, "coverage_1sigma={}", step.coverage_1sigma);
    assert!(step.coverage_2sigma >= 0.8, "coverage_2sigma={}", step.coverage_2sigma);
    // Quoted error agrees with the observed spread.
    let ratio = step.std_v1 / step.mean_v1_error;
    assert!((0.8..1.25).contains(&ratio), "spread/error={ratio}");
}

#[test]
fn test_smearing_attenuates_signal() {
    let base = ScanConfig {
        v1: 0.08,
        steps: 1,
        multiplier: 20_000,
        centrality: Centrality::Peripheral,
        seed: 3,
        ..ScanConfig::default()
    };
    let smeared = run_ensemble(&base, 12, 0).unwrap();
    let expected = base.expected_observed_v1();
    assert!(expected < 0.08);
    // Attenuated expectation is covered at 2 sigma in most runs.
    assert!(smeared.steps[0].coverage_2sigma >= 0.75, "{:?}", smeared.steps[0]);
    assert!(smeared.steps[0].mean_v1 < 0.08);
}

#[test]
fn test_significance_grows_with_sample_size() {
    let cfg = ScanConfig {
        v1: 0.05,
        steps: 5,
        multiplier: 10_000,
        variant: ModelVariant::Flat,
        seed: 11,
        ..ScanConfig::default()
    };
    let s = run_ensemble(&cfg, 8, 0).unwrap();
    let first = &s.steps[0];
    let last = &s.steps[4];
    assert!(last.mean_sod > first.mean_sod, "first={} last={}", first.mean_sod, last.mean_sod);
    assert!(last.mean_v1_error < first.mean_v1_error);
    // Error scales like 1/sqrt(N): five times the sample, about 0.45x the error.
    let ratio = last.mean_v1_error / first.mean_v1_error;
    assert!((0.35..0.55).contains(&ratio), "error ratio={ratio}");
}

#[test]
fn test_ensemble_is_reproducible() {
    let cfg = ScanConfig { v1: 0.02, steps: 2, multiplier: 3_000, seed: 5, ..ScanConfig::default() };
    let a = run_ensemble(&cfg, 4, 1).unwrap();
    let b = run_ensemble(&cfg, 4, 3).unwrap();
    for (ra, rb) in a.runs.iter().zip(&b.runs) {
        for (pa, pb) in ra.iter().zip(rb) {
            assert_eq!(pa.v1.to_bits(), pb.v1.to_bits());
            assert_eq!(pa.v1_error.to_bits(), pb.v1_error.to_bits());
        }
    }
}

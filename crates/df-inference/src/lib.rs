//! # df-inference
//!
//! The simulation-accumulate-fit-scan pipeline of the dflow toy Monte-Carlo.
//!
//! This crate provides:
//! - immutable scan configuration with the centrality coefficient table
//! - the particle generator (charge, pseudorapidity, azimuth)
//! - per-charge flow profiles with angular smearing
//! - weighted linear least-squares fits of the profiles
//! - the sample-size scan driver and repeated-run ensembles
//!
//! ## Architecture
//!
//! Everything here draws randomness through `df_core::RandomSource` and reports
//! through the [`ScanReporter`] trait; printing and plotting live with the
//! callers.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Scan configuration and coefficient lookup.
pub mod config;
/// Repeated scans with per-step summary statistics.
pub mod ensemble;
/// Weighted linear least squares on flow profiles.
pub mod linear_fit;
/// Particle model and generator.
pub mod particle;
/// Flow profiles and the two-profile accumulator.
pub mod profile;
/// Reporting collaborator interface.
pub mod report;
/// Sample-size scan driver.
pub mod scan;

pub use config::{Centrality, Coefficients, ModelVariant, ScanConfig};
pub use ensemble::{EnsembleStep, EnsembleSummary, run_ensemble};
pub use linear_fit::{LinearModel, fit_profile};
pub use particle::{Charge, Particle, ParticleGenerator};
pub use profile::{FlowAccumulator, FlowProfile, ProfileBin};
pub use report::{NullReporter, ScanReporter};
pub use scan::{ErrorPoint, GraphPoint, ScanDriver, ScanPoint, ScanResult, StepReport};

//! # df-viz
//!
//! Visualization data artifacts for dflow.
//!
//! Artifacts are plot-friendly JSON structures: parallel arrays indexed by step
//! rather than nested per-step objects.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// v1 and SoD evolution with sample size.
pub mod evolution;

pub use evolution::{EnsembleArtifact, EvolutionArtifact};

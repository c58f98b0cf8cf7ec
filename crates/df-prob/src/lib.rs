//! Probability building blocks for dflow.
//!
//! This crate hosts the sampling side of the toy Monte-Carlo:
//! - closed-form bounded densities ([`density`])
//! - numerical inverse-CDF sampling on a fixed grid ([`sampler`])

pub mod density;
pub mod sampler;

pub use density::{Density, EtaDensity, PhiDensity};
pub use sampler::TabulatedCdf;

//! # df-core
//!
//! Shared building blocks for the dflow toy Monte-Carlo:
//! - the workspace-wide [`Error`] / [`Result`] types
//! - the [`RandomSource`] abstraction every sampler draws from
//! - fit result types handed between the fit engine and the scan driver

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;
/// Core traits (random source).
pub mod traits;
/// Common data types (fit results).
pub mod types;

pub use error::{Error, Result};
pub use traits::RandomSource;
pub use types::{FitFailure, FitResult};

/// Crate version, reported by `df-cli version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for dflow

use thiserror::Error;

/// dflow error type
///
/// Only configuration problems are fatal to a scan. Sampling degeneracies and
/// fit failures are recovered where they happen and never reach this type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Invalid configuration, rejected before any sampling starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the IR pipeline

use thiserror::Error;

/// Result type for IR operations
pub type Result<T> = std::result::Result<T, IrError>;

/// Pipeline errors
///
/// Recoverable data-quality problems (bad discriminator tokens, odd enum
/// members) are logged and never surface here.
#[derive(Error, Debug)]
pub enum IrError {
    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Unsupported OpenAPI specification: {0}")]
    UnsupportedSpec(String),

    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("No graph available in context")]
    MissingGraph,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

//! Crate-level error type and result alias.

use thiserror::Error;

use crate::response::classify::ClassifyError;

/// Errors surfaced while building, loading or running a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("manifest could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response literal rejected: {0}")]
    Classify(#[from] ClassifyError),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl ManifestError {
    /// Create a `Configuration` error from anything printable.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;

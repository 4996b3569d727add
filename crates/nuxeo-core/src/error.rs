//! Error types for the nuxeo-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while interpreting Server payloads
#[derive(Error, Debug)]
pub enum CoreError {
    /// Payload did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Caller violated a contract of the model
    #[error("usage error: {0}")]
    Usage(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

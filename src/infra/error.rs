//! Error types for batch signing orchestration.
//! Error handling types and result definitions shared across the engine.

use thiserror::Error;

/// Result type for signing orchestration operations
pub type SignResult<T> = Result<T, SignError>;

/// Error taxonomy for the orchestration engine.
///
/// `ConfigurationError` is the only variant that aborts a run before any
/// task is dispatched; everything else is surfaced per task as an `Outcome`.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SignError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to launch tool: {0}")]
    LaunchFailed(String),

    #[error("Tool timed out after {seconds}s: {tool}")]
    TimedOut { tool: String, seconds: u64 },

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for SignError {
    fn from(error: std::io::Error) -> Self {
        SignError::IoError(error.to_string())
    }
}

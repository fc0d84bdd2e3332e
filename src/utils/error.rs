//! Error types and handling
//!
//! Common error types used across the pipeline.

use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The backend could not allocate or start the encoder
    #[error("failed to open encoder: {0}")]
    OpenFailure(String),

    /// An individual frame failed to encode
    #[error("frame failed to encode: {0}")]
    SubmitFailure(String),

    /// The backend could not finalize its output
    #[error("failed to finalize encoder output: {0}")]
    CloseFailure(String),

    /// Zero output size, or an operation invoked from the wrong state
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

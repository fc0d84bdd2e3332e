//! Shared utilities

pub mod error;

pub use error::{PipelineError, PipelineResult};

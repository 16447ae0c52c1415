//! Error types for divisi-export.

use std::io;
use thiserror::Error;

/// Export error type.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Requested format exists but is not implemented.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Invalid export options.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Encoding error.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Resampling error.
    #[error("Resampling error: {0}")]
    Resample(String),

    /// Invalid audio data.
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

// Convert external library errors to simple strings at the API boundary.

impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        ExportError::Io(io::Error::other(e))
    }
}

impl From<rubato::ResamplerConstructionError> for ExportError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        ExportError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for ExportError {
    fn from(e: rubato::ResampleError) -> Self {
        ExportError::Resample(e.to_string())
    }
}

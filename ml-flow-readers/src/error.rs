//! Error types for data readers

use thiserror::Error;

/// Error type for data readers
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] ml_flow_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV format error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Format error
    #[error("Format error: {0}")]
    Format(String),

    /// Unsupported operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for data readers
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for ml_flow_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(e) => e,
            Error::Io(e) => ml_flow_core::Error::Io(e),
            Error::InvalidArgument(reason) => ml_flow_core::Error::Configuration(reason),
            other => ml_flow_core::Error::Dataset(other.to_string()),
        }
    }
}

//! Error types for ML dataflow pipelines

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::token::PayloadKind;

/// Result type for ML dataflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ML dataflow operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The token handed to an actor carries a payload the actor does not accept
    #[error("{actor}: Unhandled class: {found}")]
    TypeMismatch {
        /// Full name of the rejecting actor
        actor: String,
        /// Kind of the offending payload
        found: PayloadKind,
    },

    /// An actor was executed without a pending input token
    #[error("{actor}: No token provided!")]
    NoInput {
        /// Full name of the actor
        actor: String,
    },

    /// The actor has been stopped and no longer accepts work
    #[error("{actor}: actor has been stopped")]
    Stopped {
        /// Full name of the actor
        actor: String,
    },

    /// The flow context has no storage attached
    #[error("No storage handler available!")]
    NoStorageHandler,

    /// A variable reference names a storage value that does not exist
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// An option value could not be resolved or converted
    #[error("Invalid value for option '{option}': {reason}")]
    InvalidOption {
        /// Name of the option
        option: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Invalid configuration (unknown actor kind, bad command line, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Expression could not be parsed or evaluated
    #[error("Expression error: {0}")]
    Expression(String),

    /// A configured or deserialized component is not of a supported kind
    #[error("Unhandled class: {0}")]
    UnhandledClass(String),

    /// A serialized file held an unexpected number of objects
    #[error("Expected 1 or 2 objects, but got {found} instead reading: {path}")]
    ObjectCount {
        /// Number of objects found
        found: usize,
        /// File that was read
        path: PathBuf,
    },

    /// A file given as input does not exist
    #[error("File '{0}' does not exist!")]
    FileNotFound(PathBuf),

    /// A path given as input is not a regular file
    #[error("Location '{0}' is not a file!")]
    NotAFile(PathBuf),

    /// Index out of bounds
    #[error("Index out of bounds: {index} (valid range 0..{len})")]
    IndexOutOfBounds {
        /// The offending index
        index: usize,
        /// Number of valid positions
        len: usize,
    },

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Failure reported by a dataset, loader or other data capability
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Failure reported by a model capability
    #[error("Model error: {0}")]
    Model(String),

    /// Generic execution failure of an actor step
    #[error("{0}")]
    Execution(String),

    /// Regular expression error
    #[error("Invalid regular expression: {0}")]
    Regex(String),

    /// Binary serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON (option map) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error stems from configuration rather than data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::NoStorageHandler
                | Error::UnknownVariable(_)
                | Error::InvalidOption { .. }
                | Error::Configuration(_)
        )
    }

    /// Whether this error is an input-contract violation
    pub fn is_input_violation(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. } | Error::NoInput { .. })
    }
}

//! Error types for biamp-sink
//!
//! Module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the biamp-sink crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Digital I/O line errors
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Remote-control collaborator errors
    #[error("Remote control error: {0}")]
    Remote(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from biamp-common
    #[error(transparent)]
    Common(#[from] biamp_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using biamp-sink Error
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the pcmix engine
//!
//! Loading failures surface to the caller as one of these variants; values
//! outside documented numeric ranges (volume, pan, loop bounds) are ignored
//! rather than reported.

use thiserror::Error;

/// Main error type for the pcmix engine
#[derive(Error, Debug)]
pub enum Error {
    /// Operation not valid in the current engine state (e.g. double init)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Named resource, file or URL could not be located
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// No conversion path to the canonical format, or device format unsupported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Frame count exceeds the representable range
    #[error("Resource too large: {0}")]
    ResourceTooLarge(String),

    /// Missing or malformed required parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Decoder collaborator failure
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<pcmix_common::Error> for Error {
    fn from(err: pcmix_common::Error) -> Self {
        match err {
            pcmix_common::Error::Io(e) => Error::Io(e),
            pcmix_common::Error::Config(msg) => Error::Config(msg),
            pcmix_common::Error::InvalidInput(msg) => Error::InvalidArgument(msg),
        }
    }
}

/// Convenience Result type using the pcmix Error
pub type Result<T> = std::result::Result<T, Error>;

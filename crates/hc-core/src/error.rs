//! Unified error type for hlscast.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for HTTP handlers to derive a status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in hlscast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "playlist", "segment").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation is not allowed in the current lifecycle state
    /// (e.g. writing to a muxer that was never started).
    #[error("Invalid state: {0}")]
    State(String),

    /// Media data could not be processed (bad timestamps, missing parameter sets).
    #[error("Media error: {0}")]
    Media(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The resource exists but is not ready within the allotted time.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::State(_) => 409,
            Error::Media(_) => 422,
            Error::Io { .. } => 500,
            Error::Unavailable(_) => 503,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::State(_) => "invalid_state",
            Error::Media(_) => "media_error",
            Error::Io { .. } => "io_error",
            Error::Unavailable(_) => "unavailable",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

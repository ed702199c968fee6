//! Client-side error types and their coarse kinds.

use crate::services::file_validation::ValidationError;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by [`super::PortalClient`] and the upload orchestrator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UploadError {
    /// The file was rejected locally; no request was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Connection failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The portal API answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The object store refused a presigned PUT.
    #[error("object store error ({status}): {message}")]
    ObjectStore { status: u16, message: String },

    /// The client could not be constructed.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Unknown(String),
}

/// Coarse error category reported to callers and in upload events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    Validation,
    Network,
    Server,
    ObjectStore,
    Unknown,
}

impl fmt::Display for UploadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validation => "validation",
            Self::Network => "network",
            Self::Server => "server",
            Self::ObjectStore => "object-store",
            Self::Unknown => "unknown",
        })
    }
}

impl UploadError {
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            Self::Validation(_) => UploadErrorKind::Validation,
            Self::Network(_) => UploadErrorKind::Network,
            Self::Server { .. } => UploadErrorKind::Server,
            Self::ObjectStore { .. } => UploadErrorKind::ObjectStore,
            Self::Configuration(_) | Self::Unknown(_) => UploadErrorKind::Unknown,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Unknown(format!("unexpected response body: {}", err));
        }
        if err.is_builder() {
            return Self::Configuration(err.to_string());
        }
        Self::Network(err.to_string())
    }
}

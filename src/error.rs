//! Error types.

use std::io;
use thiserror::Error;

/// Failure reported by (or while talking to) the backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("backend returned {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Create a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            code: status.to_string(),
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Not-found-class error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Authorization-class error.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Error surfaced to the protocol layer.
#[derive(Debug, Error)]
pub enum DavError {
    /// No authenticated session on the request.
    #[error("bad authentication")]
    BadAuthentication,

    /// Permission check failed, locally or at the backend.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Path does not resolve, or the backend no longer knows the object.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Name collision on create, rename or move.
    #[error("resource already exists: {0}")]
    ResourceAlreadyExists(String),

    /// Backend rejected the operation for an unspecified reason.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DavError {
    /// Create a Forbidden error.
    pub fn forbidden(path: impl Into<String>) -> Self {
        Self::Forbidden(path.into())
    }

    /// Create a ResourceNotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::ResourceNotFound(path.into())
    }

    /// Create a ResourceAlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::ResourceAlreadyExists(path.into())
    }

    /// Create an InvalidOperation error.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

/// Fixed mapping of each error class to an I/O error kind.
impl From<DavError> for io::Error {
    fn from(e: DavError) -> Self {
        match e {
            DavError::BadAuthentication => {
                io::Error::new(io::ErrorKind::PermissionDenied, "bad authentication")
            }
            DavError::Forbidden(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            DavError::ResourceNotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            DavError::ResourceAlreadyExists(msg) => {
                io::Error::new(io::ErrorKind::AlreadyExists, msg)
            }
            DavError::InvalidOperation(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            DavError::Backend(e) => io::Error::other(e.to_string()),
        }
    }
}

/// Result type for filesystem operations.
pub type DavResult<T> = Result<T, DavError>;

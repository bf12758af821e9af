//! Common error types shared across crates.

use thiserror::Error;

/// Top-level request-layer error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Upstream`] → 500
/// - [`ServiceError::Timeout`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: a missing query or body field, or invalid JSON.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The catalog provider, remote store, or media host failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// On-demand work did not finish before its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The scheduling context is not yet running or has shut down.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Upstream(_) => 500,
            ServiceError::Timeout(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Upstream(_) => "upstream_error",
            ServiceError::Timeout(_) => "timeout",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

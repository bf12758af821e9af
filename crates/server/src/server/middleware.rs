//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

/// Per-request timeout applied to all routes.
///
/// Longer than the search bridge timeout so a timed-out search still gets its
/// own JSON error body. For media downloads this only bounds the wait for
/// upstream response headers; the streamed body is not limited.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

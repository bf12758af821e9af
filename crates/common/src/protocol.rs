//! Request and response types exchanged over the public HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search endpoint
// ---------------------------------------------------------------------------

/// Query string for `GET /search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text query. Missing or blank is rejected with 400.
    pub query: Option<String>,
}

// ---------------------------------------------------------------------------
// Download endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /download-song`.
///
/// Both fields are optional at the type level so that a missing field is
/// reported as a 400 with an [`ErrorResponse`] rather than an extractor
/// rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Direct media URL to stream back to the caller.
    pub streaming_url: Option<String>,
    /// Song title, used for the attachment file name.
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(e: &crate::ServiceError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Where a refresh task currently is in its fetch → publish → sleep cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Idle,
    Fetching,
    Normalizing,
    Publishing,
    Sleeping,
}

/// Result of the most recent refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskOutcome {
    Ok { records: usize },
    Failed { reason: String },
}

/// Snapshot of one periodic refresh task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub name: String,
    pub interval_secs: u64,
    pub phase: TaskPhase,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<TaskOutcome>,
}

impl TaskReport {
    /// A report for a task that has not run yet.
    pub fn pending(name: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            name: name.into(),
            interval_secs,
            phase: TaskPhase::Idle,
            last_run_at: None,
            last_outcome: None,
        }
    }
}

/// Snapshot of one cache slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotReport {
    pub name: String,
    pub records: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether on-demand requests can currently be bridged to the scheduler.
    pub bridge_ready: bool,
    pub tasks: Vec<TaskReport>,
    pub slots: Vec<SlotReport>,
}

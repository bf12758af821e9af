//! Axum request handlers for all service endpoints.
//!
//! Cached routes never fail: they return whatever the slot holds, `[]` before
//! the first successful refresh. Only the mirror-read, on-demand search, and
//! download routes can reply with an error body.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{DownloadRequest, ErrorResponse, HealthResponse, SearchParams};
use common::ServiceError;
use serde_json::json;
use tracing::warn;

use super::state::AppState;
use crate::cache::RecordSlot;
use crate::catalog::CatalogError;
use crate::scheduler::{pipelines, TaskStatus};
use crate::store::{StoreError, NOW_TRENDING_NODE, RANDOM_ALBUMS_NODE};

/// Liveness text served at `/`.
pub const INDEX_TEXT: &str = "Sanvia is running. Visit particular routes for songs.";

/// Fallback `Content-Type` for proxied media.
const DEFAULT_MEDIA_TYPE: &str = "audio/mpeg";

/// Render a [`ServiceError`] as its status code plus JSON [`ErrorResponse`].
fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}

fn slot_response(slot: &RecordSlot) -> Response {
    let snapshot = slot.read();
    Json(snapshot.as_slice()).into_response()
}

fn mirror_read_error(node: &str, err: StoreError) -> Response {
    warn!(node, error = %err, "mirror read failed");
    error_response(ServiceError::Upstream(err.to_string()))
}

/// `GET /`
pub async fn index() -> &'static str {
    INDEX_TEXT
}

/// `GET /songs`: the cached trending songs.
pub async fn songs(State(state): State<AppState>) -> Response {
    slot_response(&state.slots.trending)
}

/// `GET /new-releases`
pub async fn new_releases(State(state): State<AppState>) -> Response {
    slot_response(&state.slots.new_releases)
}

/// `GET /top-artists`
pub async fn top_artists(State(state): State<AppState>) -> Response {
    slot_response(&state.slots.top_artists)
}

/// `GET /now-trending`: the trending dataset as last mirrored to the remote
/// store. A node that was never written reads as `[]`.
pub async fn now_trending(State(state): State<AppState>) -> Response {
    match state.mirror.read_node(NOW_TRENDING_NODE).await {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => Json(json!([])).into_response(),
        Err(e) => mirror_read_error(NOW_TRENDING_NODE, e),
    }
}

/// `GET /albums`: the cached random albums, falling back to the mirrored
/// copy while the slot is still empty (e.g. right after a restart).
pub async fn albums(State(state): State<AppState>) -> Response {
    let cached = state.slots.random_albums.read();
    if !cached.is_empty() {
        return Json(cached.as_slice()).into_response();
    }
    match state.mirror.read_node(RANDOM_ALBUMS_NODE).await {
        Ok(value) => Json(value.unwrap_or_else(|| json!([]))).into_response(),
        Err(e) => mirror_read_error(RANDOM_ALBUMS_NODE, e),
    }
}

/// `GET /search?query=`: on-demand catalog search, executed in the scheduler
/// context through the request bridge.
///
/// A missing or blank query is rejected before anything is submitted.
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let query = match params.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_owned(),
        _ => {
            return error_response(ServiceError::BadRequest(
                "query parameter is required".into(),
            ))
        }
    };

    let bridge = state.bridge.clone();
    let limit = state.search.limit;
    let timeout = state.search.timeout;
    let joined = tokio::task::spawn_blocking(move || {
        bridge.submit_and_wait(
            move |provider| async move {
                let payload = provider
                    .search_catalog(&query, limit)
                    .await
                    .map_err(CatalogError::from)?;
                pipelines::search_results(&payload, limit)
            },
            timeout,
        )
    })
    .await;

    match joined {
        Ok(Ok(records)) => Json(records).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "search failed");
            error_response(e.into())
        }
        Err(e) => error_response(ServiceError::Internal(format!("search worker failed: {e}"))),
    }
}

/// `POST /download-song`: stream a media file back as an attachment.
pub async fn download_song(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()));
        }
    };
    let (Some(url), Some(title)) = (non_blank(req.streaming_url), non_blank(req.title)) else {
        return error_response(ServiceError::BadRequest(
            "streamingUrl and title are required".into(),
        ));
    };

    let upstream = match state
        .http
        .get(&url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
    {
        Ok(resp) => resp,
        Err(e) => {
            warn!(error = %e, "media fetch failed");
            return error_response(ServiceError::Upstream(format!("failed to fetch media: {e}")));
        }
    };

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_MEDIA_TYPE));
    let disposition = format!("attachment; filename=\"{}.mp3\"", sanitize_filename(&title));

    let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    match HeaderValue::from_str(&disposition) {
        Ok(v) => {
            headers.insert(header::CONTENT_DISPOSITION, v);
        }
        Err(e) => warn!(error = %e, "dropping content-disposition header"),
    }
    response
}

/// `GET /health`: bridge readiness plus per-task and per-slot status.
///
/// Returns `200 OK` once the scheduler context accepts bridged work and
/// `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let bridge_ready = state.bridge.is_ready();
    let (status_code, status_str) = if bridge_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        bridge_ready,
        tasks: state.tasks.iter().map(TaskStatus::report).collect(),
        slots: state.slots.reports(),
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Keep a title safe for a quoted header parameter and a file name.
fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        "song".into()
    } else {
        cleaned.to_owned()
    }
}

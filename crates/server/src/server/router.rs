//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/songs", get(handlers::songs))
        .route("/now-trending", get(handlers::now_trending))
        .route("/new-releases", get(handlers::new_releases))
        .route("/albums", get(handlers::albums))
        .route("/top-artists", get(handlers::top_artists))
        .route("/search", get(handlers::search))
        .route("/download-song", post(handlers::download_song))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

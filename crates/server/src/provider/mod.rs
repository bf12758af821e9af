//! Upstream catalog provider capability.
//!
//! Every call returns the provider's raw JSON inside a fixed envelope so that
//! the refresh pipelines can validate the shape themselves:
//!
//! | Call | Envelope |
//! |---|---|
//! | [`CatalogProvider::get_playlist`] | `{"data": {"list": [song...]}}` |
//! | [`CatalogProvider::get_new_releases`] | `{"data": [song...]}` |
//! | [`CatalogProvider::search_albums`] | `{"data": {"results": [album...]}}` |
//! | [`CatalogProvider::search_catalog`] | `{"data": {"results": [song...]}}` |
//! | [`CatalogProvider::get_top_artists`] | `{"data": {"top_artists": [artist...]}}` |

pub mod saavn;

pub use saavn::SaavnClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors from the provider client.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure, timeout, or a non-2xx status.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The response body was not valid JSON.
    #[error("provider response is not valid JSON: {0}")]
    Malformed(String),

    /// The caller passed an argument the provider cannot use.
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),
}

/// Async access to the upstream music catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Songs of the playlist at `url`, at most `limit`.
    async fn get_playlist(&self, url: &str, limit: usize) -> Result<Value, ProviderError>;

    /// The provider's current new-release listing.
    async fn get_new_releases(&self) -> Result<Value, ProviderError>;

    /// Album search.
    async fn search_albums(&self, query: &str, limit: usize) -> Result<Value, ProviderError>;

    /// Song search, used by on-demand `/search`.
    async fn search_catalog(&self, query: &str, limit: usize) -> Result<Value, ProviderError>;

    /// The provider's top-artists chart.
    async fn get_top_artists(&self) -> Result<Value, ProviderError>;
}

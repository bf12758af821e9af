//! Remote document store used to mirror datasets.
//!
//! A node holds one complete dataset (e.g. `/now_trending`) and is always
//! replaced wholesale; nothing ever patches part of a node.

pub mod file;
pub mod firebase;

pub use file::FileStore;
pub use firebase::FirebaseStore;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{Config, StoreBackend};

/// Node holding the mirrored trending songs.
pub const NOW_TRENDING_NODE: &str = "/now_trending";

/// Node holding the mirrored random albums.
pub const RANDOM_ALBUMS_NODE: &str = "/random_albums";

/// Errors from a [`RemoteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote store read failed: {0}")]
    ReadFailed(String),

    #[error("remote store write failed: {0}")]
    WriteFailed(String),

    /// The node path cannot be mapped onto the backend.
    #[error("invalid node path: {0}")]
    InvalidPath(String),
}

/// Read/replace access to named JSON nodes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Current value of `path`, or `None` if the node was never written.
    async fn read_node(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value of `path` with `value`.
    async fn write_node(&self, path: &str, value: &Value) -> Result<(), StoreError>;
}

/// Construct the configured store backend.
///
/// Call once per execution context; HTTP clients are not shared between the
/// scheduler runtime and the request runtime.
///
/// # Errors
///
/// Returns an error if the backend's client cannot be constructed.
pub fn from_config(cfg: &Config) -> Result<Arc<dyn RemoteStore>> {
    let store: Arc<dyn RemoteStore> = match cfg.remote_store {
        StoreBackend::Firebase => {
            let url = cfg
                .firebase_db_url
                .clone()
                .context("FIREBASE_DB_URL is required for the firebase store")?;
            Arc::new(FirebaseStore::new(
                url,
                cfg.firebase_auth_token.clone(),
                cfg.provider_timeout(),
            )?)
        }
        StoreBackend::File => Arc::new(FileStore::new(&cfg.mirror_dir)),
    };
    Ok(store)
}

/// Node path without leading/trailing slashes, rejecting traversal.
pub(crate) fn node_key(path: &str) -> Result<&str, StoreError> {
    let key = path.trim_matches('/');
    if key.is_empty() || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(StoreError::InvalidPath(path.to_owned()));
    }
    Ok(key)
}

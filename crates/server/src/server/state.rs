//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use crate::bridge::RequestBridge;
use crate::cache::Slots;
use crate::config::Config;
use crate::scheduler::TaskStatus;
use crate::store::{FileStore, RemoteStore};

/// Limits applied to on-demand `/search` requests.
#[derive(Clone, Copy, Debug)]
pub struct SearchSettings {
    /// Maximum number of results requested from the provider.
    pub limit: usize,
    /// How long a handler waits on the bridge before giving up.
    pub timeout: Duration,
}

impl SearchSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            limit: cfg.search_limit,
            timeout: cfg.search_timeout(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            limit: 20,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable so that Axum can clone the state for each
/// request without copying cached datasets.
#[derive(Clone)]
pub struct AppState {
    /// Dataset caches written by the scheduler.
    pub slots: Slots,
    /// Remote mirror, read by `/now-trending` and as the `/albums` fallback.
    pub mirror: Arc<dyn RemoteStore>,
    /// Gateway into the scheduler context for on-demand work.
    pub bridge: RequestBridge,
    /// Status handles of the refresh tasks, for `/health`.
    pub tasks: Arc<Vec<TaskStatus>>,
    pub search: SearchSettings,
    /// Client used to proxy media downloads.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        slots: Slots,
        mirror: Arc<dyn RemoteStore>,
        bridge: RequestBridge,
        tasks: Vec<TaskStatus>,
        search: SearchSettings,
        http: reqwest::Client,
    ) -> Self {
        Self {
            slots,
            mirror,
            bridge,
            tasks: Arc::new(tasks),
            search,
            http,
        }
    }
}

impl Default for AppState {
    /// Empty caches, a detached bridge, and a mirror directory that does not
    /// exist yet. Suitable for tests.
    fn default() -> Self {
        let mirror_dir = std::env::temp_dir().join(format!("sanvia-mirror-{}", uuid::Uuid::new_v4()));
        Self::new(
            Slots::new(),
            Arc::new(FileStore::new(mirror_dir)),
            RequestBridge::new(),
            Vec::new(),
            SearchSettings::default(),
            reqwest::Client::new(),
        )
    }
}

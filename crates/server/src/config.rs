//! Configuration loading and validation for the catalog service.
//!
//! All values are read from environment variables at startup (a `.env` file in
//! the working directory is loaded first, if present). The process exits with
//! a clear error message if any required variable is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::server::middleware::REQUEST_TIMEOUT;

/// Which [`crate::store::RemoteStore`] backend mirrors datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Firebase Realtime Database over REST.
    Firebase,
    /// One JSON file per node under [`Config::mirror_dir`].
    File,
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream playlist backing the trending dataset. **Required.**
    pub playlist_url: String,

    /// Base URL of the upstream catalog API.
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Per-call timeout (seconds) for upstream catalog requests.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    #[serde(default = "default_refresh_interval")]
    pub trending_refresh_interval_secs: u64,

    #[serde(default = "default_refresh_interval")]
    pub new_releases_refresh_interval_secs: u64,

    #[serde(default = "default_refresh_interval")]
    pub random_albums_refresh_interval_secs: u64,

    #[serde(default = "default_refresh_interval")]
    pub top_artists_refresh_interval_secs: u64,

    /// Number of trending songs kept and mirrored.
    #[serde(default = "default_dataset_limit")]
    pub trending_limit: usize,

    /// Number of new releases kept.
    #[serde(default = "default_dataset_limit")]
    pub new_releases_limit: usize,

    /// Number of albums sampled per random-albums cycle.
    #[serde(default = "default_dataset_limit")]
    pub random_albums_count: usize,

    /// Comma-separated queries used to gather the random-album pool.
    #[serde(default = "default_album_seed_queries")]
    pub album_seed_queries: String,

    /// How many seed queries are drawn per random-albums cycle.
    #[serde(default = "default_seed_queries_per_cycle")]
    pub seed_queries_per_cycle: usize,

    /// Results returned by `GET /search`.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// How long (seconds) `GET /search` waits on the scheduler before giving up.
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    /// Mirror backend.
    #[serde(default = "default_remote_store")]
    pub remote_store: StoreBackend,

    /// Realtime Database URL, e.g. `https://<project>.firebaseio.com`.
    /// Required when `REMOTE_STORE=firebase`.
    #[serde(default)]
    pub firebase_db_url: Option<String>,

    /// Database secret or ID token appended as `?auth=`.
    #[serde(default)]
    pub firebase_auth_token: Option<String>,

    /// Directory used by the file mirror.
    #[serde(default = "default_mirror_dir")]
    pub mirror_dir: String,

    /// OTLP collector endpoint. Spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8000
}
fn default_provider_base_url() -> String {
    "https://www.jiosaavn.com/api.php".into()
}
fn default_provider_timeout() -> u64 {
    15
}
fn default_refresh_interval() -> u64 {
    7200
}
fn default_dataset_limit() -> usize {
    12
}
fn default_album_seed_queries() -> String {
    "bollywood,romantic,party,lofi,punjabi,indie,retro,devotional,workout,chill".into()
}
fn default_seed_queries_per_cycle() -> usize {
    3
}
fn default_search_limit() -> usize {
    20
}
fn default_search_timeout() -> u64 {
    10
}
fn default_remote_store() -> StoreBackend {
    StoreBackend::File
}
fn default_mirror_dir() -> String {
    "mirror".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is the normal production case.
        let _ = dotenvy::dotenv();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Seed queries for the random-albums task, trimmed and non-empty.
    pub fn album_seeds(&self) -> Vec<String> {
        self.album_seed_queries
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.playlist_url, "PLAYLIST_URL")?;
        ensure_non_empty(&self.provider_base_url, "PROVIDER_BASE_URL")?;

        for (value, name) in [
            (self.trending_refresh_interval_secs, "TRENDING_REFRESH_INTERVAL_SECS"),
            (self.new_releases_refresh_interval_secs, "NEW_RELEASES_REFRESH_INTERVAL_SECS"),
            (self.random_albums_refresh_interval_secs, "RANDOM_ALBUMS_REFRESH_INTERVAL_SECS"),
            (self.top_artists_refresh_interval_secs, "TOP_ARTISTS_REFRESH_INTERVAL_SECS"),
            (self.search_timeout_secs, "SEARCH_TIMEOUT_SECS"),
            (self.provider_timeout_secs, "PROVIDER_TIMEOUT_SECS"),
        ] {
            if value == 0 {
                anyhow::bail!("{name} must be > 0");
            }
        }

        if self.search_timeout() >= REQUEST_TIMEOUT {
            anyhow::bail!(
                "SEARCH_TIMEOUT_SECS must be below the {}s request timeout",
                REQUEST_TIMEOUT.as_secs()
            );
        }

        if self.album_seeds().is_empty() {
            anyhow::bail!("ALBUM_SEED_QUERIES must contain at least one query");
        }

        if self.remote_store == StoreBackend::Firebase {
            match self.firebase_db_url.as_deref() {
                Some(url) => ensure_non_empty(url, "FIREBASE_DB_URL")?,
                None => anyhow::bail!("FIREBASE_DB_URL is required when REMOTE_STORE=firebase"),
            }
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

//! The concrete refresh tasks and the on-demand search transform.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::CanonicalRecord;
use serde_json::Value;

use super::task::{RefreshTask, Sink};
use crate::cache::Slots;
use crate::catalog::{dedupe, list_at, normalize, raw_key, sample, CatalogError, RawKind};
use crate::config::Config;
use crate::provider::CatalogProvider;
use crate::store::{RemoteStore, NOW_TRENDING_NODE, RANDOM_ALBUMS_NODE};

/// Albums requested per seed query when gathering the random-album pool.
const ALBUMS_PER_SEED: usize = 20;

/// Build every refresh task the service runs.
///
/// # Errors
///
/// Returns an error if any task is misconfigured.
pub fn all(cfg: &Config, slots: &Slots, store: Arc<dyn RemoteStore>) -> Result<Vec<RefreshTask>> {
    Ok(vec![
        now_trending(cfg, slots, Arc::clone(&store))?,
        new_releases(cfg, slots)?,
        random_albums(cfg, slots, store)?,
        top_artists(cfg, slots)?,
    ])
}

/// Trending playlist → slot + `/now_trending`.
pub fn now_trending(cfg: &Config, slots: &Slots, store: Arc<dyn RemoteStore>) -> Result<RefreshTask> {
    let url = cfg.playlist_url.clone();
    let limit = cfg.trending_limit;
    RefreshTask::builder("now_trending")
        .interval(Duration::from_secs(cfg.trending_refresh_interval_secs))
        .fetch(move |provider| {
            let url = url.clone();
            async move {
                let payload = provider.get_playlist(&url, limit).await?;
                list_at(&payload, &["data", "list"])
            }
        })
        .transform(move |raw| songs(raw, limit))
        .sink(Sink::CacheAndMirror {
            slot: slots.trending.clone(),
            store,
            node: NOW_TRENDING_NODE.into(),
        })
        .build()
}

/// New-release listing → slot.
pub fn new_releases(cfg: &Config, slots: &Slots) -> Result<RefreshTask> {
    let limit = cfg.new_releases_limit;
    RefreshTask::builder("new_releases")
        .interval(Duration::from_secs(cfg.new_releases_refresh_interval_secs))
        .fetch(|provider| async move {
            let payload = provider.get_new_releases().await?;
            list_at(&payload, &["data"])
        })
        .transform(move |raw| songs(raw, limit))
        .sink(Sink::Cache(slots.new_releases.clone()))
        .build()
}

/// Album searches over a few random seed queries, deduplicated and sampled →
/// slot + `/random_albums`.
pub fn random_albums(cfg: &Config, slots: &Slots, store: Arc<dyn RemoteStore>) -> Result<RefreshTask> {
    let seeds = cfg.album_seeds();
    let per_cycle = cfg.seed_queries_per_cycle.max(1);
    let count = cfg.random_albums_count;
    RefreshTask::builder("random_albums")
        .interval(Duration::from_secs(cfg.random_albums_refresh_interval_secs))
        .fetch(move |provider| {
            let picked = sample(seeds.clone(), per_cycle);
            async move { album_pool(provider.as_ref(), &picked).await }
        })
        .transform(move |raw| {
            let unique = dedupe(raw, raw_key(&["id"]));
            sample(unique, count)
                .iter()
                .map(|r| normalize(r, RawKind::Album))
                .collect()
        })
        .sink(Sink::CacheAndMirror {
            slot: slots.random_albums.clone(),
            store,
            node: RANDOM_ALBUMS_NODE.into(),
        })
        .build()
}

/// Top-artists chart → slot.
pub fn top_artists(cfg: &Config, slots: &Slots) -> Result<RefreshTask> {
    RefreshTask::builder("top_artists")
        .interval(Duration::from_secs(cfg.top_artists_refresh_interval_secs))
        .fetch(|provider| async move {
            let payload = provider.get_top_artists().await?;
            list_at(&payload, &["data", "top_artists"])
        })
        .transform(|raw| {
            dedupe(raw, raw_key(&["id", "artistid"]))
                .iter()
                .map(|r| normalize(r, RawKind::Artist))
                .collect()
        })
        .sink(Sink::Cache(slots.top_artists.clone()))
        .build()
}

/// Normalize a catalog search payload, at most `limit` records.
///
/// # Errors
///
/// Returns [`CatalogError::MalformedPayload`] if the payload has the wrong shape.
pub fn search_results(payload: &Value, limit: usize) -> Result<Vec<CanonicalRecord>, CatalogError> {
    Ok(list_at(payload, &["data", "results"])?
        .iter()
        .take(limit)
        .map(|r| normalize(r, RawKind::SearchResult))
        .collect())
}

fn songs(raw: Vec<Value>, limit: usize) -> Vec<CanonicalRecord> {
    raw.iter()
        .take(limit)
        .map(|r| normalize(r, RawKind::Song))
        .collect()
}

/// Concatenate album results for every seed. A seed that fails is skipped as
/// long as at least one succeeds; otherwise the last error is returned.
async fn album_pool(
    provider: &dyn CatalogProvider,
    seeds: &[String],
) -> Result<Vec<Value>, CatalogError> {
    let mut pool = Vec::new();
    let mut last_err = None;
    let mut any_ok = false;
    for seed in seeds {
        let albums = match provider.search_albums(seed, ALBUMS_PER_SEED).await {
            Ok(payload) => list_at(&payload, &["data", "results"]),
            Err(e) => Err(e.into()),
        };
        match albums {
            Ok(mut albums) => {
                any_ok = true;
                pool.append(&mut albums);
            }
            Err(e) => {
                tracing::debug!(seed = %seed, error = %e, "album seed query failed");
                last_err = Some(e);
            }
        }
    }
    match (any_ok, last_err) {
        (false, Some(e)) => Err(e),
        _ => Ok(pool),
    }
}

//! A single named dataset cache cell.
//!
//! The slot uses `arc-swap` so readers never block: a publish swaps in a
//! completely new snapshot and a concurrent read sees either the old or the
//! new one, never a mix.

use std::fmt::Display;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use common::protocol::SlotReport;

/// Everything a reader can observe about a slot at one instant.
#[derive(Debug)]
struct Snapshot<T> {
    value: Arc<Vec<T>>,
    refreshed_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Shared, lock-free cache of one dataset.
///
/// Cloning is cheap and yields a handle to the same cell. Only the owning
/// refresh task calls [`CacheSlot::publish`] and [`CacheSlot::record_failure`];
/// everything else only reads.
#[derive(Debug)]
pub struct CacheSlot<T> {
    name: Arc<str>,
    inner: Arc<ArcSwap<Snapshot<T>>>,
}

impl<T> Clone for CacheSlot<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> CacheSlot<T> {
    /// Create a new, empty slot.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            inner: Arc::new(ArcSwap::from_pointee(Snapshot {
                value: Arc::new(Vec::new()),
                refreshed_at: None,
                last_error: None,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The latest published dataset (empty if never published).
    ///
    /// This is a lock-free read; safe to call from any thread or runtime.
    pub fn read(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.inner.load().value)
    }

    /// Atomically replace the dataset and stamp the refresh time.
    ///
    /// A successful publish also clears any previously recorded failure.
    pub fn publish(&self, value: Vec<T>) {
        self.inner.store(Arc::new(Snapshot {
            value: Arc::new(value),
            refreshed_at: Some(Utc::now()),
            last_error: None,
        }));
    }

    /// Record a failed refresh without touching the dataset.
    pub fn record_failure(&self, err: impl Display) {
        let msg = err.to_string();
        self.inner.rcu(|cur| Snapshot {
            value: Arc::clone(&cur.value),
            refreshed_at: cur.refreshed_at,
            last_error: Some(msg.clone()),
        });
    }

    /// Consistent status view for the health endpoint.
    pub fn report(&self) -> SlotReport {
        let snap = self.inner.load();
        SlotReport {
            name: self.name.to_string(),
            records: snap.value.len(),
            last_refreshed_at: snap.refreshed_at,
            last_error: snap.last_error.clone(),
        }
    }
}

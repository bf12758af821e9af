//! Read-mostly dataset caches shared between the scheduler and the HTTP layer.
//!
//! # Module invariants
//!
//! - Each [`CacheSlot`] has exactly one writer: the refresh task it was handed to.
//! - A failed refresh never replaces a slot's value (stale-but-valid).

pub mod slot;

pub use slot::CacheSlot;

use common::protocol::SlotReport;
use common::CanonicalRecord;

/// Slot holding canonical catalog records.
pub type RecordSlot = CacheSlot<CanonicalRecord>;

/// The full set of dataset slots the service exposes.
#[derive(Clone, Debug)]
pub struct Slots {
    pub trending: RecordSlot,
    pub new_releases: RecordSlot,
    pub random_albums: RecordSlot,
    pub top_artists: RecordSlot,
}

impl Slots {
    /// Create all slots, empty.
    pub fn new() -> Self {
        Self {
            trending: CacheSlot::new("now_trending"),
            new_releases: CacheSlot::new("new_releases"),
            random_albums: CacheSlot::new("random_albums"),
            top_artists: CacheSlot::new("top_artists"),
        }
    }

    pub fn reports(&self) -> Vec<SlotReport> {
        [
            &self.trending,
            &self.new_releases,
            &self.random_albums,
            &self.top_artists,
        ]
        .into_iter()
        .map(CacheSlot::report)
        .collect()
    }
}

impl Default for Slots {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_slots_start_empty() {
        let slots = Slots::new();
        let reports = slots.reports();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r.records == 0 && r.last_refreshed_at.is_none()));
    }
}

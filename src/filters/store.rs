//! Committed filter state for one list view.
//!
//! Each committed mutation bumps the filter epoch: the epoch tags every page
//! fetch, and responses from an older epoch are dropped at apply time by the
//! pagination merger. Reads are always whole-snapshot, never partial.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::events::{ControllerEvent, EventBus};
use crate::logger::{self, LogTag};

use super::types::{FilterSet, FilterUpdate};

pub struct FilterStore {
    inner: RwLock<FilterSet>,
    epoch: AtomicU64,
    events: EventBus,
}

impl FilterStore {
    pub fn new(events: EventBus) -> Self {
        Self::with_initial(FilterSet::default(), events)
    }

    /// Seed from persisted state so a reload keeps the user's filters.
    pub fn with_initial(filters: FilterSet, events: EventBus) -> Self {
        Self {
            inner: RwLock::new(filters),
            epoch: AtomicU64::new(0),
            events,
        }
    }

    pub fn snapshot(&self) -> FilterSet {
        self.inner.read().clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Commit one mutation. Returns the new epoch.
    pub fn apply(&self, update: FilterUpdate) -> u64 {
        {
            let mut filters = self.inner.write();
            filters.apply(update);
        }
        self.bump_epoch()
    }

    /// Restore defaults wholesale. Returns the new epoch.
    pub fn reset(&self) -> u64 {
        {
            let mut filters = self.inner.write();
            filters.reset();
        }
        self.bump_epoch()
    }

    fn bump_epoch(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        logger::debug(LogTag::Filters, &format!("filter epoch advanced to {}", epoch));
        self.events.emit(ControllerEvent::FiltersChanged { epoch });
        epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::types::SortOrder;

    #[test]
    fn every_commit_bumps_the_epoch() {
        let store = FilterStore::new(EventBus::new());
        assert_eq!(store.epoch(), 0);

        let e1 = store.apply(FilterUpdate::County(Some("Cluj".into())));
        let e2 = store.apply(FilterUpdate::SortBy(SortOrder::NameAsc));
        let e3 = store.reset();

        assert_eq!((e1, e2, e3), (1, 2, 3));
        assert_eq!(store.epoch(), 3);
    }

    #[test]
    fn snapshot_reflects_latest_committed_state() {
        let store = FilterStore::new(EventBus::new());
        store.apply(FilterUpdate::Search(Some("panif".into())));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.search.as_deref(), Some("panif"));

        store.reset();
        assert_eq!(store.snapshot(), FilterSet::default());
    }

    #[tokio::test]
    async fn commits_notify_subscribers() {
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let store = FilterStore::new(events);

        store.apply(FilterUpdate::City(Some("Brasov".into())));

        match rx.recv().await {
            Ok(ControllerEvent::FiltersChanged { epoch }) => assert_eq!(epoch, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

//! Monotonic version stamps, one per tracked (list, kind) pair, so sync
//! clients can detect change without re-downloading unchanged lists.

use crate::error::Error;
use crate::store::Store;
use crate::types::Kind;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedList {
    Blocklist,
    Whitelist,
}

pub fn data_type(list: TrackedList, kind: Kind) -> &'static str {
    match (list, kind) {
        (TrackedList::Blocklist, Kind::Domain) => "blocklist_domains",
        (TrackedList::Blocklist, Kind::Email) => "blocklist_emails",
        (TrackedList::Whitelist, Kind::Domain) => "whitelist_domains",
        (TrackedList::Whitelist, Kind::Email) => "whitelist_emails",
    }
}

#[derive(Clone)]
pub struct VersionTracker {
    store: Arc<Store>,
}

impl VersionTracker {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Advances the stamp and returns the new value.
    pub fn bump(&self, list: TrackedList, kind: Kind) -> Result<i64, Error> {
        self.store.bump_version(data_type(list, kind))
    }

    /// Current stamp; 0 when the list has never changed.
    pub fn current(&self, list: TrackedList, kind: Kind) -> Result<i64, Error> {
        self.store.current_version(data_type(list, kind))
    }
}

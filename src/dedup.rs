//! Repair of duplicate blocklist rows left behind by runs that predate the
//! uniqueness index. Keeps the earliest (lowest-id) row per value.
//!
//! Must not run concurrently with ingestion on the same kind; that exclusion
//! is the scheduler's job, not in-process locking.

use crate::error::Error;
use crate::store::Store;
use crate::types::Kind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Deduplicator {
    store: Arc<Store>,
    chunk_size: usize,
    stop: Arc<AtomicBool>,
}

impl Deduplicator {
    pub fn new(store: Arc<Store>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Removes redundant rows for `kind`, chunk by chunk with one commit per
    /// chunk. A chunk failure aborts the run fail-fast; the error carries
    /// the count already committed, distinct from total success.
    pub fn deduplicate(&self, kind: Kind) -> Result<usize, Error> {
        let values = self.store.duplicated_block_values(kind)?;
        if values.is_empty() {
            info!("no duplicated {} values found", kind);
            return Ok(0);
        }
        info!("found {} duplicated {} values", values.len(), kind);

        let mut deleted = 0usize;
        for chunk in values.chunks(self.chunk_size) {
            if self.stop.load(Ordering::Relaxed) {
                warn!("stop requested, ending deduplication after current chunk");
                break;
            }
            match self.store.prune_duplicate_blocks(kind, chunk) {
                Ok(n) => deleted += n,
                Err(Error::Store(cause)) => {
                    return Err(Error::PartialBatchFailure {
                        completed: deleted,
                        cause,
                    })
                }
                Err(e) => return Err(e),
            }
        }

        info!("deduplication removed {} redundant {} rows", deleted, kind);
        Ok(deleted)
    }
}

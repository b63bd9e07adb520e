//! Bulk feed ingestion: parse heterogeneous lists, reconcile against the
//! store, insert only genuinely new entries in bounded chunks.

use crate::error::Error;
use crate::listparse;
use crate::normalize::normalize;
use crate::store::Store;
use crate::types::{EntryStatus, IngestSummary, Kind, NewBlockEntry};
use crate::version::{TrackedList, VersionTracker};
use futures::StreamExt;
use reqwest::Client;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{error, info, warn};

pub struct IngestionPipeline {
    store: Arc<Store>,
    versions: VersionTracker,
    client: Client,
    chunk_size: usize,
    stop: Arc<AtomicBool>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<Store>, chunk_size: usize) -> Result<Self, Error> {
        let versions = VersionTracker::new(store.clone());
        Ok(Self {
            store,
            versions,
            client: Client::builder().user_agent("phishguard/0.1").build()?,
            chunk_size: chunk_size.max(1),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for requesting a clean stop after the current chunk.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Ingests one source's lines. Within-run duplicates, already-stored
    /// values and unparseable lines are counted, never fatal; only store
    /// failures abort.
    pub fn ingest<I, S>(&self, kind: Kind, source_id: &str, lines: I) -> Result<IngestSummary, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = IngestSummary::default();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut fresh: Vec<String> = Vec::new();

        for line in lines {
            let line = line.as_ref();
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            let candidate = match listparse::extract(line) {
                Some(c) => c,
                None => {
                    summary.skipped_invalid += 1;
                    continue;
                }
            };
            match normalize(kind, candidate) {
                Some(value) => {
                    if seen.insert(value.clone()) {
                        fresh.push(value);
                    } else {
                        summary.skipped_duplicate_in_file += 1;
                    }
                }
                None => summary.skipped_invalid += 1,
            }
        }

        info!(
            "source '{}': {} candidate {} values after parsing",
            source_id,
            fresh.len(),
            kind
        );

        for chunk in fresh.chunks(self.chunk_size) {
            if self.stop.load(Ordering::Relaxed) {
                warn!("stop requested, ending ingestion after current chunk");
                break;
            }
            self.process_chunk(kind, source_id, chunk, &mut summary)?;
        }

        Ok(summary)
    }

    fn process_chunk(
        &self,
        kind: Kind,
        source_id: &str,
        chunk: &[String],
        summary: &mut IngestSummary,
    ) -> Result<(), Error> {
        let existing = self.store.existing_block_values(kind, chunk)?;
        let mut known: FxHashSet<&str> = FxHashSet::default();
        let mut reactivated = 0usize;

        for row in &existing {
            known.insert(row.value.as_str());
            if row.status == EntryStatus::Inactive {
                let merged = merge_source(row.source.as_deref(), source_id);
                self.store.reactivate_block(row.id, &merged)?;
                reactivated += 1;
            } else {
                summary.skipped_existing_in_store += 1;
            }
        }

        let new_entries: Vec<NewBlockEntry> = chunk
            .iter()
            .filter(|v| !known.contains(v.as_str()))
            .map(|v| NewBlockEntry {
                value: v.clone(),
                reason: None,
                source: Some(source_id.to_string()),
            })
            .collect();

        let added = if new_entries.is_empty() {
            0
        } else {
            match self.store.insert_block_batch(kind, &new_entries) {
                Ok(()) => new_entries.len(),
                Err(Error::Conflict) => {
                    // A concurrent writer slipped rows in after the existence
                    // check; retry individually and treat conflicts as
                    // already-existing.
                    warn!(
                        "chunk insert hit a uniqueness conflict, retrying {} rows individually",
                        new_entries.len()
                    );
                    let mut inserted = 0usize;
                    for entry in &new_entries {
                        if self.store.insert_block_single(kind, entry)? {
                            inserted += 1;
                        } else {
                            summary.skipped_existing_in_store += 1;
                        }
                    }
                    inserted
                }
                Err(e) => return Err(e),
            }
        };

        summary.added += added;
        summary.reactivated += reactivated;
        if added > 0 || reactivated > 0 {
            self.versions.bump(TrackedList::Blocklist, kind)?;
        }
        Ok(())
    }

    /// Runs ingestion over every configured feed. A feed that cannot be
    /// read or ingested counts one error and processing continues.
    pub async fn run(&self, kind: Kind, feeds: &[(String, String)]) -> IngestSummary {
        let mut total = IngestSummary::default();

        for (name, location) in feeds {
            if self.stop.load(Ordering::Relaxed) {
                warn!("stop requested, remaining feeds skipped");
                break;
            }
            let lines = match self.read_source(name, location).await {
                Ok(lines) => lines,
                Err(e) => {
                    error!("{}", e);
                    total.errors += 1;
                    continue;
                }
            };
            match self.ingest(kind, name, lines) {
                Ok(summary) => {
                    info!(
                        "feed '{}': added {}, reactivated {}, skipped {} invalid / {} in-file dup / {} existing",
                        name,
                        summary.added,
                        summary.reactivated,
                        summary.skipped_invalid,
                        summary.skipped_duplicate_in_file,
                        summary.skipped_existing_in_store
                    );
                    total.merge(&summary);
                }
                Err(e) => {
                    error!("feed '{}' failed: {}", name, e);
                    total.errors += 1;
                }
            }
        }

        total
    }

    async fn read_source(&self, name: &str, location: &str) -> Result<Vec<String>, Error> {
        if location.starts_with("http://") || location.starts_with("https://") {
            info!("Fetching feed '{}' from {}", name, location);
            let resp = self
                .client
                .get(location)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| Error::Source {
                    name: name.to_string(),
                    detail: e.to_string(),
                })?;

            let stream = resp
                .bytes_stream()
                .map(|result| result.map_err(std::io::Error::other));
            let reader = StreamReader::new(stream);
            let mut lines = BufReader::new(reader).lines();
            let mut out = Vec::new();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => out.push(line),
                    Ok(None) => break,
                    // A transfer that dies mid-body leaves a truncated feed;
                    // it must surface as a source error, not a short list.
                    Err(e) => {
                        return Err(Error::Source {
                            name: name.to_string(),
                            detail: e.to_string(),
                        })
                    }
                }
            }
            Ok(out)
        } else {
            info!("Reading feed '{}' from {}", name, location);
            let text = tokio::fs::read_to_string(location)
                .await
                .map_err(|e| Error::Source {
                    name: name.to_string(),
                    detail: e.to_string(),
                })?;
            Ok(text.lines().map(str::to_owned).collect())
        }
    }
}

fn merge_source(existing: Option<&str>, source_id: &str) -> String {
    match existing {
        Some(prev) if prev.split(',').any(|s| s.trim() == source_id) => prev.to_string(),
        Some(prev) if !prev.is_empty() => format!("{prev},{source_id}"),
        _ => source_id.to_string(),
    }
}

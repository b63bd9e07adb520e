//! Intake of user-submitted candidate indicators.

use crate::error::Error;
use crate::normalize::normalize;
use crate::store::Store;
use crate::types::{EntryStatus, Kind, Report, ReportIntent};
use crate::version::{TrackedList, VersionTracker};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a report submission, distinct per suppression rule so the
/// caller can answer precisely.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    /// Normalization rejected the value.
    InvalidValue,
    /// Whitelisted values are never reportable; no row is created.
    IgnoredWhitelisted,
    /// The value is already actively blocked; no row is created.
    IgnoredAlreadyBlocked,
    /// A pending report for this (kind, value) already exists.
    AlreadyReported,
    Created(Report),
    /// False-positive correction: the block entry was sent back to review.
    FlaggedForReview,
    /// False-positive correction with no matching block entry.
    NotFound,
}

#[derive(Clone)]
pub struct Reporter {
    store: Arc<Store>,
    versions: VersionTracker,
}

impl Reporter {
    pub fn new(store: Arc<Store>) -> Self {
        let versions = VersionTracker::new(store.clone());
        Self { store, versions }
    }

    pub fn report(
        &self,
        kind: Kind,
        intent: ReportIntent,
        raw: &str,
        reason: Option<&str>,
        source: Option<&str>,
    ) -> Result<ReportOutcome, Error> {
        let Some(value) = normalize(kind, raw) else {
            warn!("report rejected, invalid {} value: {:?}", kind, raw);
            return Ok(ReportOutcome::InvalidValue);
        };
        match intent {
            ReportIntent::NewSuspicion => self.submit(kind, &value, reason, source),
            ReportIntent::FalsePositiveCorrection => self.flag_false_positive(kind, &value),
        }
    }

    fn submit(
        &self,
        kind: Kind,
        value: &str,
        reason: Option<&str>,
        source: Option<&str>,
    ) -> Result<ReportOutcome, Error> {
        if self.store.find_whitelisted(kind, value)?.is_some() {
            info!("report for whitelisted {} '{}' ignored", kind, value);
            return Ok(ReportOutcome::IgnoredWhitelisted);
        }
        if self.store.find_active_block(kind, value)?.is_some() {
            info!("report for already-blocked {} '{}' ignored", kind, value);
            return Ok(ReportOutcome::IgnoredAlreadyBlocked);
        }
        if self.store.has_pending_report(kind, value)? {
            return Ok(ReportOutcome::AlreadyReported);
        }

        // The check above is not atomic against concurrent reporters; the
        // partial unique index on pending reports is the backstop.
        match self.store.insert_report(kind, value, reason, source) {
            Ok(report) => {
                info!("created report {} for {} '{}'", report.id, kind, value);
                Ok(ReportOutcome::Created(report))
            }
            Err(Error::Conflict) => Ok(ReportOutcome::AlreadyReported),
            Err(e) => Err(e),
        }
    }

    fn flag_false_positive(&self, kind: Kind, value: &str) -> Result<ReportOutcome, Error> {
        if !self
            .store
            .set_block_status(kind, value, EntryStatus::UnderReview)?
        {
            return Ok(ReportOutcome::NotFound);
        }
        info!(
            "{} '{}' flagged for review after false-positive report",
            kind, value
        );
        self.versions.bump(TrackedList::Blocklist, kind)?;
        Ok(ReportOutcome::FlaggedForReview)
    }
}

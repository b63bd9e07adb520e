use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a stored indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Domain,
    Email,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Domain => "domain",
            Kind::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Kind> {
        match s {
            "domain" => Some(Kind::Domain),
            "email" => Some(Kind::Email),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a submitted report means. Kept separate from `Kind` so one string
/// field never carries two concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportIntent {
    /// "This value is suspicious, please review it."
    NewSuspicion,
    /// "This value is wrongly blocked, please re-review the block entry."
    FalsePositiveCorrection,
}

/// Parses the wire-level report tag (`domain`, `email`,
/// `false_positive_domain`, `false_positive_email`).
pub fn parse_report_tag(tag: &str) -> Option<(Kind, ReportIntent)> {
    if let Some(rest) = tag.strip_prefix("false_positive_") {
        return Kind::parse(rest).map(|k| (k, ReportIntent::FalsePositiveCorrection));
    }
    Kind::parse(tag).map(|k| (k, ReportIntent::NewSuspicion))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Active,
    Inactive,
    UnderReview,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Active => "active",
            EntryStatus::Inactive => "inactive",
            EntryStatus::UnderReview => "under_review",
        }
    }

    pub fn parse(s: &str) -> EntryStatus {
        match s {
            "inactive" => EntryStatus::Inactive,
            "under_review" => EntryStatus::UnderReview,
            _ => EntryStatus::Active, // Fallback
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
    FalsePositive,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
            ReportStatus::FalsePositive => "false_positive",
        }
    }

    pub fn parse(s: &str) -> ReportStatus {
        match s {
            "approved" => ReportStatus::Approved,
            "rejected" => ReportStatus::Rejected,
            "false_positive" => ReportStatus::FalsePositive,
            _ => ReportStatus::Pending, // Fallback
        }
    }
}

/// A blocklisted indicator row.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry {
    pub id: i64,
    pub kind: Kind,
    pub value: String,
    pub reason: Option<String>,
    pub source: Option<String>,
    pub status: EntryStatus,
    pub added_at: i64,
}

/// A whitelisted indicator row. Takes unconditional precedence over a
/// block entry for the same (kind, value).
#[derive(Debug, Clone, Serialize)]
pub struct WhitelistEntry {
    pub id: i64,
    pub kind: Kind,
    pub value: String,
    pub reason: Option<String>,
    pub added_by: Option<String>,
    pub added_at: i64,
}

/// A user-submitted candidate awaiting moderation.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: i64,
    pub kind: Kind,
    pub value: String,
    pub reason: Option<String>,
    pub source: Option<String>,
    pub status: ReportStatus,
    pub reported_at: i64,
}

/// Insert payload for a new block entry produced by ingestion.
#[derive(Debug, Clone)]
pub struct NewBlockEntry {
    pub value: String,
    pub reason: Option<String>,
    pub source: Option<String>,
}

/// Projection of a stored block row used by the ingestion existence check.
#[derive(Debug, Clone)]
pub struct ExistingBlock {
    pub id: i64,
    pub value: String,
    pub status: EntryStatus,
    pub source: Option<String>,
}

/// Aggregate result of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub added: usize,
    pub reactivated: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate_in_file: usize,
    pub skipped_existing_in_store: usize,
    pub errors: usize,
}

impl IngestSummary {
    pub fn merge(&mut self, other: &IngestSummary) {
        self.added += other.added;
        self.reactivated += other.reactivated;
        self.skipped_invalid += other.skipped_invalid;
        self.skipped_duplicate_in_file += other.skipped_duplicate_in_file;
        self.skipped_existing_in_store += other.skipped_existing_in_store;
        self.errors += other.errors;
    }
}

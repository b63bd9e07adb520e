//! Status resolution for a normalized key: whitelist first, then active
//! blocklist, else safe.

use crate::error::Error;
use crate::normalize::normalize;
use crate::store::Store;
use crate::types::{BlockEntry, Kind, WhitelistEntry};
use std::sync::Arc;
use tracing::debug;

/// Resolution of a normalized (kind, value) key.
#[derive(Debug, Clone)]
pub enum Verdict {
    Whitelisted(WhitelistEntry),
    Blocked(BlockEntry),
    Safe,
}

/// Result of a full check, including the lenient invalid-input path: an
/// unrecognized value cannot be confirmed dangerous, so it resolves to a
/// defined safe outcome flagged as `invalid_format` rather than an error.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Whitelisted(WhitelistEntry),
    Blocked(BlockEntry),
    Safe { invalid_format: bool },
}

#[derive(Clone)]
pub struct Resolver {
    store: Arc<Store>,
}

impl Resolver {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Whitelist-over-blocklist priority is absolute: an active block entry
    /// is never surfaced when a whitelist entry exists for the same key.
    pub fn resolve(&self, kind: Kind, value: &str) -> Result<Verdict, Error> {
        if let Some(entry) = self.store.find_whitelisted(kind, value)? {
            debug!("{} '{}' is whitelisted", kind, value);
            return Ok(Verdict::Whitelisted(entry));
        }
        if let Some(entry) = self.store.find_active_block(kind, value)? {
            debug!("{} '{}' is blocked", kind, value);
            return Ok(Verdict::Blocked(entry));
        }
        Ok(Verdict::Safe)
    }

    /// Normalizes raw input and resolves it. Store failures surface as
    /// errors, never as a safe outcome.
    pub fn check(&self, kind: Kind, raw: &str) -> Result<CheckOutcome, Error> {
        let Some(value) = normalize(kind, raw) else {
            debug!("invalid {} input treated as safe: {:?}", kind, raw);
            return Ok(CheckOutcome::Safe {
                invalid_format: true,
            });
        };
        let outcome = match self.resolve(kind, &value)? {
            Verdict::Whitelisted(entry) => CheckOutcome::Whitelisted(entry),
            Verdict::Blocked(entry) => CheckOutcome::Blocked(entry),
            Verdict::Safe => CheckOutcome::Safe {
                invalid_format: false,
            },
        };
        Ok(outcome)
    }
}

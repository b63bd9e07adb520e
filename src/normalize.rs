//! Canonicalization of raw user input into matchable keys.
//!
//! Normalization is a pure function of (raw input, kind) and is idempotent:
//! re-normalizing a normalized value yields the same value. Invalid input is
//! signalled with `None`; the caller decides whether that means "reject" or
//! "treat as safe".

use crate::types::Kind;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").unwrap());

static IPV4_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").unwrap());

pub fn normalize(kind: Kind, raw: &str) -> Option<String> {
    match kind {
        Kind::Domain => normalize_domain(raw),
        Kind::Email => normalize_email(raw),
    }
}

fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Full URLs yield their hostname; everything else is treated as a
    // hostname directly.
    let host = if trimmed.contains("://") {
        let parsed = Url::parse(trimmed).ok()?;
        parsed.host_str()?.to_string()
    } else {
        trimmed.to_string()
    };

    let mut host = host.to_lowercase();

    // Stripping every leading `www.` label keeps the function idempotent
    // even for inputs like `www.www.example.com`.
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest.to_string();
    }
    let host = host.trim_matches('.');

    if host.is_empty() || host.contains(':') || IPV4_RE.is_match(host) {
        return None;
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return None;
    }
    if !has_valid_labels(host) {
        return None;
    }

    Some(host.to_string())
}

fn has_valid_labels(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    for label in &labels {
        if label.is_empty() || label.starts_with('-') || label.ends_with('-') {
            return false;
        }
    }
    let tld = labels[labels.len() - 1];
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn normalize_email(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&lowered) {
        return None;
    }
    // The regex allows a trailing numeric/hyphenated label; the final label
    // of the domain part must still be a real TLD.
    let domain_part = lowered.rsplit('@').next()?;
    if !has_valid_labels(domain_part) {
        return None;
    }
    Some(lowered)
}

//! Per-line candidate extraction from heterogeneous feed formats.
//!
//! Extraction is format-specific and deliberately separate from
//! normalization, which is kind-specific and shared. The returned candidate
//! is raw; callers pipe it through [`crate::normalize`] next.

/// Extracts a raw candidate from one physical line of a feed.
///
/// Recognized shapes:
/// - blank lines and `#`/`!` comments -> `None`
/// - Adblock-style `||domain^` / `||domain$option` (entries containing
///   wildcards or paths are not atomic hostnames and are discarded)
/// - hosts-file style `0.0.0.0 domain` / `127.0.0.1 domain`
/// - anything else is taken as-is (bare value or full URL)
pub fn extract(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("||") {
        let end = rest.find(['^', '$']).unwrap_or(rest.len());
        let candidate = &rest[..end];
        if candidate.is_empty() || candidate.contains('*') || candidate.contains('/') {
            return None;
        }
        return Some(candidate);
    }

    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    if first == "0.0.0.0" || first == "127.0.0.1" {
        // Hosts-file rule: the mapped hostname is the last token.
        return tokens.last();
    }

    Some(line)
}

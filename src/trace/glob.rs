//! Wildcard patterns used by CloudFront aliases, cache behaviours and ALB
//! rule conditions
//!
//! `*` matches any run of characters and `?` exactly one; everything else is
//! literal and the whole input must match.

use regex::Regex;

/// Translate a wildcard pattern into an anchored regex
fn compile(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{}$", escaped)).ok()
}

/// Test `text` against a wildcard pattern
///
/// A pattern ending in `/*` also matches its bare prefix, so `/api/*`
/// matches `/api` the way an ALB path condition does.
pub fn matches(text: &str, pattern: &str) -> bool {
    if pattern.strip_suffix("/*") == Some(text) {
        return true;
    }

    match compile(pattern) {
        Some(re) => re.is_match(text),
        None => {
            tracing::debug!("Ignoring unusable pattern {:?}", pattern);
            false
        }
    }
}

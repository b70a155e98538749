//! Shared cache metadata document
//!
//! Shape on disk (stable across versions):
//!
//! ```json
//! { "last_updated": "...", "services": { "<kind>": { "last_updated": "...", "refreshing": false, "busy_pid": 0 } } }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::ResourceKind;

/// Per-kind refresh bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMeta {
    /// Time of the last successful refresh; None if never refreshed
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Set while a process is refreshing this kind
    #[serde(default)]
    pub refreshing: bool,
    /// PID of the refreshing process; meaningful only while `refreshing`
    #[serde(default)]
    pub busy_pid: i32,
}

/// The whole metadata document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Time of the most recent successful refresh of any kind
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Keyed by kind name; unknown kinds written by other versions are kept
    #[serde(default)]
    pub services: BTreeMap<String, ServiceMeta>,
}

impl CacheMetadata {
    pub fn service(&self, kind: ResourceKind) -> Option<&ServiceMeta> {
        self.services.get(kind.as_str())
    }

    pub fn service_mut(&mut self, kind: ResourceKind) -> &mut ServiceMeta {
        self.services.entry(kind.as_str().to_string()).or_default()
    }

    /// Age of a kind's snapshot at `now`, or None if it was never refreshed
    pub fn age(&self, kind: ResourceKind, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.service(kind)?.last_updated?;
        // Clock skew between processes can put last_updated in the future
        Some((now - last).to_std().unwrap_or(Duration::ZERO))
    }

    /// Whether a kind needs refreshing: never refreshed or older than `ttl`
    pub fn is_stale(&self, kind: ResourceKind, ttl: Duration, now: DateTime<Utc>) -> bool {
        match self.age(kind, now) {
            Some(age) => age > ttl,
            None => true,
        }
    }

    /// Record a successful refresh of `kind` at `now`
    pub fn mark_refreshed(&mut self, kind: ResourceKind, now: DateTime<Utc>) {
        self.service_mut(kind).last_updated = Some(now);
        self.last_updated = Some(now);
    }
}

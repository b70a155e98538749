//! Local snapshot cache
//!
//! One JSON array per resource kind plus a shared `meta.json` document that
//! tracks refresh times and the advisory refresh lock for every kind.
//!
//! The store itself has no concurrency logic; the refresh coordinator owns
//! the read-modify-write cycle on the metadata document.

pub mod lock;
pub mod meta;
pub mod store;

pub use lock::{AdvisoryLock, HeldLock, LockAttempt, current_pid, is_process_alive};
pub use meta::{CacheMetadata, ServiceMeta};
pub use store::CacheStore;

use std::path::PathBuf;

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to access cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

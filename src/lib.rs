//! cloudpath library
//!
//! Traces how a request for a domain travels through an AWS account, backed
//! by a local snapshot cache that is refreshed without stepping on other
//! processes doing the same.

pub mod cache;
pub mod cli;
pub mod cloud;
pub mod config;
pub mod models;
pub mod refresh;
pub mod trace;

// Re-export commonly used types for convenience
pub use cache::{CacheError, CacheStore};
pub use models::ResourceKind;
pub use refresh::{RefreshCoordinator, RefreshSettings};
pub use trace::{TraceEngine, TraceResult};

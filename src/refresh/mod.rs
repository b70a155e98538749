//! Cache refresh
//!
//! - `coordinator.rs` - Locking, staleness and background refresh
//! - `reporter.rs` - Progress reporting for interactive and background use

mod coordinator;
mod reporter;

pub use coordinator::{
    CacheStatus, KindStatus, RefreshCoordinator, RefreshError, RefreshOutcome, RefreshSettings,
};
pub use reporter::{ConsoleReporter, LogReporter, RefreshReporter, SilentReporter};

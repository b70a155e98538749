//! Refresh progress reporting

use std::fmt::Display;

use crate::models::ResourceKind;

/// Receives progress for one kind's refresh
///
/// Called from refresh tasks, possibly several at once.
pub trait RefreshReporter: Send + Sync {
    fn update(&self, kind: ResourceKind, message: &str);

    fn success(&self, kind: ResourceKind, records: usize);

    fn failure(&self, kind: ResourceKind, error: &dyn Display);
}

/// Progress lines on stderr for interactive commands
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    icons: bool,
}

impl ConsoleReporter {
    pub fn new(icons: bool) -> Self {
        Self { icons }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RefreshReporter for ConsoleReporter {
    fn update(&self, kind: ResourceKind, message: &str) {
        eprintln!("  {} {}...", kind, message);
    }

    fn success(&self, kind: ResourceKind, records: usize) {
        let mark = if self.icons { "✓" } else { "[OK]" };
        eprintln!(" {} {} refreshed ({} records)", mark, kind, records);
    }

    fn failure(&self, kind: ResourceKind, error: &dyn Display) {
        let mark = if self.icons { "✗" } else { "[ERR]" };
        eprintln!(" {} {} refresh failed: {}", mark, kind, error);
    }
}

/// Reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl RefreshReporter for LogReporter {
    fn update(&self, kind: ResourceKind, message: &str) {
        tracing::debug!("{}: {}", kind, message);
    }

    fn success(&self, kind: ResourceKind, records: usize) {
        tracing::info!("{} refreshed ({} records)", kind, records);
    }

    fn failure(&self, kind: ResourceKind, error: &dyn Display) {
        tracing::warn!("{} refresh failed: {}", kind, error);
    }
}

/// For background refreshes: failures are logged, nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl RefreshReporter for SilentReporter {
    fn update(&self, _kind: ResourceKind, _message: &str) {}

    fn success(&self, _kind: ResourceKind, _records: usize) {}

    fn failure(&self, kind: ResourceKind, error: &dyn Display) {
        tracing::error!("Background refresh of {} failed: {}", kind, error);
    }
}

//! Advisory cross-process refresh lock
//!
//! The lock is the `refreshing`/`busy_pid` pair for one kind inside the
//! shared metadata document. It is cooperative: nothing stops a process from
//! ignoring it, and the check-then-acquire sequence is not atomic across
//! processes. Two processes racing on the same kind can both acquire it.
//! That is tolerated for a tool that runs on one developer machine.
//!
//! A lock whose owner PID no longer exists is treated as free, so a refresh
//! interrupted by a crash never wedges a kind.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::CacheResult;
use super::store::CacheStore;
use crate::models::ResourceKind;

/// Check whether a process exists
///
/// Best effort: `pid <= 0`, a failed lookup, or a failed no-op signal all
/// count as "not alive". A recycled PID will look alive.
pub fn is_process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // Signal 0 performs the permission and existence checks only
        kill(Pid::from_raw(pid), None).is_ok()
    }
    #[cfg(not(unix))]
    {
        pid as u32 == std::process::id()
    }
}

/// PID of the current process as stored in metadata
pub fn current_pid() -> i32 {
    i32::try_from(std::process::id()).unwrap_or(i32::MAX)
}

/// Outcome of an acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    /// This process now owns the kind's refresh
    Acquired,
    /// A live process already owns it
    HeldBy(i32),
}

/// Advisory refresh lock for one resource kind
#[derive(Debug, Clone)]
pub struct AdvisoryLock {
    store: CacheStore,
    /// Serializes metadata read-modify-write cycles within this process
    meta_guard: Arc<Mutex<()>>,
    kind: ResourceKind,
    pid: i32,
}

impl AdvisoryLock {
    pub fn new(store: CacheStore, meta_guard: Arc<Mutex<()>>, kind: ResourceKind) -> Self {
        Self {
            store,
            meta_guard,
            kind,
            pid: current_pid(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// PID of the live process holding the lock, if any
    pub fn is_held(&self) -> Option<i32> {
        let meta = self.store.read_meta().ok()?;
        let svc = meta.service(self.kind)?;
        (svc.refreshing && is_process_alive(svc.busy_pid)).then_some(svc.busy_pid)
    }

    /// Claim the lock unless a live process holds it
    ///
    /// The marker is written before any network call so an owner that dies
    /// mid-refresh still leaves a PID the next caller can check.
    pub fn try_acquire(&self) -> CacheResult<LockAttempt> {
        let _guard = self.meta_guard.lock().unwrap_or_else(|e| e.into_inner());

        let mut meta = self.store.read_meta_or_default();
        let svc = meta.service_mut(self.kind);
        if svc.refreshing && is_process_alive(svc.busy_pid) {
            return Ok(LockAttempt::HeldBy(svc.busy_pid));
        }
        if svc.refreshing {
            tracing::info!(
                "Reclaiming {} refresh lock from dead process {}",
                self.kind,
                svc.busy_pid
            );
        }

        svc.refreshing = true;
        svc.busy_pid = self.pid;
        self.store.write_meta(&meta)?;
        Ok(LockAttempt::Acquired)
    }

    /// Clear the marker; on success also stamp the refresh time
    ///
    /// Re-reads the document so updates other kinds made meanwhile survive.
    pub fn release(&self, success: bool) -> CacheResult<()> {
        let _guard = self.meta_guard.lock().unwrap_or_else(|e| e.into_inner());

        let mut meta = self.store.read_meta_or_default();
        let svc = meta.service_mut(self.kind);
        svc.refreshing = false;
        if success {
            meta.mark_refreshed(self.kind, Utc::now());
        }
        self.store.write_meta(&meta)
    }

    /// Acquire and wrap the lock in a guard that releases it on drop
    pub fn acquire_guard(self) -> CacheResult<Result<HeldLock, i32>> {
        match self.try_acquire()? {
            LockAttempt::Acquired => Ok(Ok(HeldLock {
                lock: self,
                succeeded: false,
            })),
            LockAttempt::HeldBy(pid) => Ok(Err(pid)),
        }
    }
}

/// An acquired lock; released exactly once when dropped
///
/// Dropping covers every exit path of a refresh: normal return, `?`
/// propagation, panic, and the refresh future being dropped on cancel.
#[derive(Debug)]
pub struct HeldLock {
    lock: AdvisoryLock,
    succeeded: bool,
}

impl HeldLock {
    /// Mark the refresh successful so release stamps `last_updated`
    pub fn succeed(&mut self) {
        self.succeeded = true;
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release(self.succeeded) {
            tracing::error!(
                "Failed to clear {} refresh marker: {}",
                self.lock.kind,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_in(dir: &std::path::Path, kind: ResourceKind) -> AdvisoryLock {
        AdvisoryLock::new(CacheStore::new(dir), Arc::new(Mutex::new(())), kind)
    }

    #[test]
    fn test_process_liveness() {
        assert!(is_process_alive(current_pid()));
        assert!(!is_process_alive(0));
        assert!(!is_process_alive(-1));
        assert!(!is_process_alive(i32::MAX));
    }

    #[test]
    fn test_acquire_then_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path(), ResourceKind::Ec2);

        assert_eq!(lock.is_held(), None);
        assert_eq!(lock.try_acquire().unwrap(), LockAttempt::Acquired);
        assert_eq!(lock.is_held(), Some(current_pid()));
        assert_eq!(
            lock.try_acquire().unwrap(),
            LockAttempt::HeldBy(current_pid())
        );
    }

    #[test]
    fn test_dead_owner_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let mut meta = crate::cache::CacheMetadata::default();
        meta.service_mut(ResourceKind::Ec2).refreshing = true;
        meta.service_mut(ResourceKind::Ec2).busy_pid = i32::MAX;
        store.write_meta(&meta).unwrap();

        let lock = lock_in(dir.path(), ResourceKind::Ec2);
        assert_eq!(lock.is_held(), None);
        assert_eq!(lock.try_acquire().unwrap(), LockAttempt::Acquired);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path(), ResourceKind::CloudFront);

        {
            let held = lock.clone().acquire_guard().unwrap();
            assert!(held.is_ok());
            assert!(lock.is_held().is_some());
        }

        let meta = CacheStore::new(dir.path()).read_meta().unwrap();
        let svc = meta.service(ResourceKind::CloudFront).unwrap();
        assert!(!svc.refreshing);
        assert_eq!(svc.last_updated, None);
    }

    #[test]
    fn test_successful_release_stamps_time() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path(), ResourceKind::Route53Zones);
        let start = Utc::now();

        {
            let mut held = lock.clone().acquire_guard().unwrap().unwrap();
            held.succeed();
        }

        let meta = CacheStore::new(dir.path()).read_meta().unwrap();
        let svc = meta.service(ResourceKind::Route53Zones).unwrap();
        assert!(!svc.refreshing);
        assert!(svc.last_updated.unwrap() >= start);
        assert!(meta.last_updated.unwrap() >= start);
    }
}

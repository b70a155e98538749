//! Refresh coordination
//!
//! At most one refresh per kind runs at a time across processes, enforced by
//! the advisory lock in the metadata document. Background refreshes are
//! tracked so the process can drain them before exiting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::reporter::{LogReporter, RefreshReporter, SilentReporter};
use crate::cache::{AdvisoryLock, CacheError, CacheStore, is_process_alive};
use crate::cloud::{Credentials, FetchRegistry};
use crate::models::ResourceKind;

/// Result of a refresh that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was written
    Refreshed { records: usize },
    /// Another live process holds the kind's lock; nothing was fetched
    AlreadyRefreshing { pid: i32 },
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("No fetcher registered for {0}")]
    NoFetcher(ResourceKind),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Fetching {kind} failed: {error:#}")]
    Fetch {
        kind: ResourceKind,
        error: anyhow::Error,
    },

    #[error("Refresh of {0} canceled")]
    Canceled(ResourceKind),

    #[error("Refresh task for {0} aborted")]
    Aborted(ResourceKind),
}

/// Cache state of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindStatus {
    Never,
    Refreshing { pid: i32 },
    Fresh { age: Duration },
    Stale { age: Duration },
}

/// Snapshot of the whole cache's state
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub last_updated: Option<DateTime<Utc>>,
    pub kinds: Vec<(ResourceKind, KindStatus)>,
}

/// Knobs for a coordinator
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub credentials: Credentials,
    /// Snapshots older than this are stale
    pub ttl: Duration,
    /// Whether stale kinds are refreshed in the background
    pub auto_refresh: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            ttl: crate::config::defaults::default_ttl(),
            auto_refresh: true,
        }
    }
}

struct Inner {
    store: CacheStore,
    registry: FetchRegistry,
    settings: RefreshSettings,
    meta_guard: Arc<Mutex<()>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// Owns refresh semantics on top of a [`CacheStore`]
///
/// Cheap to clone; clones share the background task tracker and the
/// in-process metadata guard.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("cache_dir", &self.inner.store.dir())
            .field("settings", &self.inner.settings)
            .field("background", &self.inner.tracker.len())
            .finish()
    }
}

impl RefreshCoordinator {
    /// `cancel` aborts in-flight fetches; their locks are still released
    pub fn new(
        store: CacheStore,
        registry: FetchRegistry,
        settings: RefreshSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                registry,
                settings,
                meta_guard: Arc::new(Mutex::new(())),
                tracker: TaskTracker::new(),
                cancel,
            }),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.inner.settings
    }

    /// Advisory lock for one kind, sharing this coordinator's metadata guard
    pub fn lock(&self, kind: ResourceKind) -> AdvisoryLock {
        AdvisoryLock::new(
            self.inner.store.clone(),
            self.inner.meta_guard.clone(),
            kind,
        )
    }

    /// Cached snapshot, or None on a miss
    pub fn load<T: DeserializeOwned>(&self, kind: ResourceKind) -> Option<Vec<T>> {
        self.inner.store.load(kind)
    }

    /// Load a snapshot, refreshing first if it is missing or `force` is set
    ///
    /// When another process is already refreshing the kind, whatever is
    /// currently cached is returned.
    pub async fn ensure_fresh<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        force: bool,
        reporter: &dyn RefreshReporter,
    ) -> Result<Vec<T>, RefreshError> {
        if !force {
            if let Some(records) = self.load(kind) {
                return Ok(records);
            }
        }

        if let RefreshOutcome::AlreadyRefreshing { pid } = self.refresh_sync(kind, reporter).await?
        {
            tracing::warn!(
                "{} is being refreshed by process {}; using the existing cache",
                kind,
                pid
            );
        }
        Ok(self.load(kind).unwrap_or_default())
    }

    /// Refresh one kind now, unless a live process already is
    pub async fn refresh_sync(
        &self,
        kind: ResourceKind,
        reporter: &dyn RefreshReporter,
    ) -> Result<RefreshOutcome, RefreshError> {
        let fetcher = self
            .inner
            .registry
            .get(kind)
            .ok_or(RefreshError::NoFetcher(kind))?;

        let mut held = match self.lock(kind).acquire_guard() {
            Ok(Ok(held)) => held,
            Ok(Err(pid)) => {
                reporter.update(kind, &format!("already refreshing in process {}", pid));
                return Ok(RefreshOutcome::AlreadyRefreshing { pid });
            }
            Err(e) => {
                reporter.failure(kind, &e);
                return Err(e.into());
            }
        };

        // From here every return path drops `held`, which clears the marker
        reporter.update(kind, "fetching");
        let fetched = tokio::select! {
            _ = self.inner.cancel.cancelled() => Err(RefreshError::Canceled(kind)),
            res = fetcher.fetch_json(&self.inner.settings.credentials) => {
                res.map_err(|error| RefreshError::Fetch { kind, error })
            }
        };
        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                reporter.failure(kind, &e);
                return Err(e);
            }
        };

        reporter.update(kind, "saving");
        if let Err(e) = self.inner.store.save(kind, &records) {
            reporter.failure(kind, &e);
            return Err(e.into());
        }

        held.succeed();
        drop(held);
        reporter.success(kind, records.len());
        Ok(RefreshOutcome::Refreshed {
            records: records.len(),
        })
    }

    /// Start a background refresh if `kind` is stale and nobody is refreshing it
    ///
    /// Returns whether a refresh was started. Never waits for it.
    pub fn auto_refresh_if_stale(&self, kind: ResourceKind) -> bool {
        if !self.inner.settings.auto_refresh {
            return false;
        }

        let stale = match self.inner.store.read_meta() {
            Ok(meta) => meta.is_stale(kind, self.inner.settings.ttl, Utc::now()),
            Err(e) => {
                tracing::debug!("Cache metadata unavailable ({}), refreshing {}", e, kind);
                true
            }
        };
        if !stale {
            return false;
        }
        if let Some(pid) = self.lock(kind).is_held() {
            tracing::debug!("{} is stale but process {} is refreshing it", kind, pid);
            return false;
        }

        tracing::info!("{} cache is stale, refreshing in the background", kind);
        let this = self.clone();
        self.inner.tracker.spawn(async move {
            // The reporter already logged any failure
            let _ = this.refresh_sync(kind, &SilentReporter).await;
        });
        true
    }

    /// Number of background refreshes still running
    pub fn background_count(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait for background refreshes to finish, or until `cancel` fires
    ///
    /// Background refreshes observe the coordinator's own token. When `cancel`
    /// is that token they stop too and release their locks; any other token
    /// only ends the wait.
    pub async fn wait(&self, cancel: &CancellationToken) {
        let tracker = &self.inner.tracker;
        tracker.close();
        if tracker.is_empty() {
            return;
        }

        tokio::select! {
            _ = tracker.wait() => {}
            _ = cancel.cancelled() => {
                if !tracker.is_empty() {
                    tracing::warn!(
                        "Interrupted: stopped waiting for {} background refresh(es)",
                        tracker.len()
                    );
                }
            }
        }
    }

    /// Refresh several kinds in parallel, one task per kind
    ///
    /// Results come back in the order of `kinds`; one kind failing does not
    /// affect the others.
    pub async fn refresh_all(
        &self,
        kinds: &[ResourceKind],
        reporter: Arc<dyn RefreshReporter>,
    ) -> Vec<(ResourceKind, Result<RefreshOutcome, RefreshError>)> {
        let handles: Vec<_> = kinds
            .iter()
            .map(|&kind| {
                let this = self.clone();
                let reporter = reporter.clone();
                tokio::spawn(async move { this.refresh_sync(kind, reporter.as_ref()).await })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;
        kinds
            .iter()
            .zip(joined)
            .map(|(&kind, res)| {
                let res = res.unwrap_or_else(|e| {
                    tracing::error!("Refresh task for {} failed to complete: {}", kind, e);
                    Err(RefreshError::Aborted(kind))
                });
                (kind, res)
            })
            .collect()
    }

    /// Refresh every registered kind, logging progress
    pub async fn refresh_registered(
        &self,
    ) -> Vec<(ResourceKind, Result<RefreshOutcome, RefreshError>)> {
        let kinds = self.inner.registry.kinds();
        self.refresh_all(&kinds, Arc::new(LogReporter)).await
    }

    /// Classify each kind's cache state
    pub fn status(&self, kinds: &[ResourceKind]) -> CacheStatus {
        let meta = self.inner.store.read_meta_or_default();
        let now = Utc::now();
        let ttl = self.inner.settings.ttl;

        let kinds = kinds
            .iter()
            .map(|&kind| {
                let refreshing = meta
                    .service(kind)
                    .filter(|svc| svc.refreshing && is_process_alive(svc.busy_pid));
                let status = match (refreshing, meta.age(kind, now)) {
                    (Some(svc), _) => KindStatus::Refreshing { pid: svc.busy_pid },
                    (None, None) => KindStatus::Never,
                    (None, Some(age)) if age > ttl => KindStatus::Stale { age },
                    (None, Some(age)) => KindStatus::Fresh { age },
                };
                (kind, status)
            })
            .collect();

        CacheStatus {
            last_updated: meta.last_updated,
            kinds,
        }
    }
}

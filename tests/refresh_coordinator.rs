//! Refresh coordinator tests
//!
//! Locking, staleness and background refresh behaviour against a temp cache
//! directory and fake fetchers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use cloudpath::cache::{CacheMetadata, CacheStore, current_pid};
use cloudpath::cloud::{Credentials, FetchRegistry, Fetcher};
use cloudpath::models::{Ec2Instance, ResourceKind};
use cloudpath::refresh::{
    KindStatus, RefreshCoordinator, RefreshError, RefreshOutcome, RefreshReporter,
    RefreshSettings, SilentReporter,
};

/// Returns `size` instances and counts its calls
struct Counting {
    kind: ResourceKind,
    size: usize,
    calls: Arc<AtomicUsize>,
}

impl Counting {
    fn new(kind: ResourceKind, size: usize) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                kind,
                size,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Fetcher for Counting {
    type Record = Ec2Instance;

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn fetch(&self, _credentials: &Credentials) -> Result<Vec<Ec2Instance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.size)
            .map(|i| Ec2Instance {
                instance_id: format!("i-{:04}", i),
                ..Default::default()
            })
            .collect())
    }
}

struct Failing(ResourceKind);

#[async_trait]
impl Fetcher for Failing {
    type Record = Ec2Instance;

    fn kind(&self) -> ResourceKind {
        self.0
    }

    async fn fetch(&self, _credentials: &Credentials) -> Result<Vec<Ec2Instance>> {
        Err(anyhow!("ExpiredToken: the security token included in the request is expired"))
    }
}

struct Slow(ResourceKind, Duration);

#[async_trait]
impl Fetcher for Slow {
    type Record = Ec2Instance;

    fn kind(&self) -> ResourceKind {
        self.0
    }

    async fn fetch(&self, _credentials: &Credentials) -> Result<Vec<Ec2Instance>> {
        tokio::time::sleep(self.1).await;
        Ok(Vec::new())
    }
}

/// Collects reporter events as `kind:event` strings
#[derive(Default)]
struct Recording(Mutex<Vec<String>>);

impl Recording {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl RefreshReporter for Recording {
    fn update(&self, kind: ResourceKind, message: &str) {
        self.0.lock().unwrap().push(format!("{}:{}", kind, message));
    }

    fn success(&self, kind: ResourceKind, records: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("{}:ok {}", kind, records));
    }

    fn failure(&self, kind: ResourceKind, _error: &dyn std::fmt::Display) {
        self.0.lock().unwrap().push(format!("{}:failed", kind));
    }
}

fn coordinator_with(
    dir: &std::path::Path,
    registry: FetchRegistry,
    cancel: CancellationToken,
) -> RefreshCoordinator {
    RefreshCoordinator::new(
        CacheStore::new(dir),
        registry,
        RefreshSettings {
            ttl: Duration::from_secs(3600),
            ..Default::default()
        },
        cancel,
    )
}

fn coordinator(dir: &std::path::Path, registry: FetchRegistry) -> RefreshCoordinator {
    coordinator_with(dir, registry, CancellationToken::new())
}

fn single<F: Fetcher + 'static>(fetcher: F) -> FetchRegistry {
    let mut registry = FetchRegistry::new();
    registry.register(fetcher);
    registry
}

fn mark_busy(store: &CacheStore, kind: ResourceKind, pid: i32) {
    let mut meta = store.read_meta_or_default();
    meta.service_mut(kind).refreshing = true;
    meta.service_mut(kind).busy_pid = pid;
    store.write_meta(&meta).unwrap();
}

#[tokio::test]
async fn test_live_owner_blocks_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, calls) = Counting::new(ResourceKind::Ec2, 3);
    let coord = coordinator(dir.path(), single(fetcher));
    mark_busy(coord.store(), ResourceKind::Ec2, current_pid());

    let outcome = coord
        .refresh_sync(ResourceKind::Ec2, &SilentReporter)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RefreshOutcome::AlreadyRefreshing { pid: current_pid() }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    // The other owner's marker is left alone
    let meta = coord.store().read_meta().unwrap();
    assert!(meta.service(ResourceKind::Ec2).unwrap().refreshing);
}

#[tokio::test]
async fn test_dead_owner_is_reclaimed() {
    for stale_pid in [0, i32::MAX] {
        let dir = tempfile::tempdir().unwrap();
        let (fetcher, calls) = Counting::new(ResourceKind::Ec2, 2);
        let coord = coordinator(dir.path(), single(fetcher));
        mark_busy(coord.store(), ResourceKind::Ec2, stale_pid);

        let outcome = coord
            .refresh_sync(ResourceKind::Ec2, &SilentReporter)
            .await
            .unwrap();

        assert_eq!(outcome, RefreshOutcome::Refreshed { records: 2 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let meta = coord.store().read_meta().unwrap();
        assert!(!meta.service(ResourceKind::Ec2).unwrap().refreshing);
    }
}

#[tokio::test]
async fn test_success_stamps_last_updated() {
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, _) = Counting::new(ResourceKind::Ec2, 5);
    let coord = coordinator(dir.path(), single(fetcher));
    let start = Utc::now();
    let recording = Recording::default();

    coord
        .refresh_sync(ResourceKind::Ec2, &recording)
        .await
        .unwrap();

    let meta = coord.store().read_meta().unwrap();
    let svc = meta.service(ResourceKind::Ec2).unwrap();
    assert!(!svc.refreshing);
    assert!(svc.last_updated.unwrap() >= start);
    assert!(meta.last_updated.unwrap() >= start);

    let cached: Vec<Ec2Instance> = coord.load(ResourceKind::Ec2).unwrap();
    assert_eq!(cached.len(), 5);
    assert_eq!(cached[0].instance_id, "i-0000");
    assert_eq!(
        recording.events(),
        vec!["ec2:fetching", "ec2:saving", "ec2:ok 5"]
    );
}

#[tokio::test]
async fn test_failure_keeps_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let before = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let mut meta = CacheMetadata::default();
    meta.mark_refreshed(ResourceKind::Ec2, before);
    store.write_meta(&meta).unwrap();
    let previous = vec![Ec2Instance {
        instance_id: "i-old".to_string(),
        ..Default::default()
    }];
    store.save(ResourceKind::Ec2, &previous).unwrap();

    let coord = coordinator(dir.path(), single(Failing(ResourceKind::Ec2)));
    let recording = Recording::default();
    let err = coord
        .refresh_sync(ResourceKind::Ec2, &recording)
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::Fetch { kind: ResourceKind::Ec2, .. }));
    assert!(err.to_string().contains("ExpiredToken"));
    assert_eq!(recording.events(), vec!["ec2:fetching", "ec2:failed"]);

    let meta = coord.store().read_meta().unwrap();
    let svc = meta.service(ResourceKind::Ec2).unwrap();
    assert!(!svc.refreshing);
    assert_eq!(svc.last_updated, Some(before));
    assert_eq!(meta.last_updated, Some(before));
    let cached: Vec<Ec2Instance> = coord.load(ResourceKind::Ec2).unwrap();
    assert_eq!(cached, previous);
}

#[tokio::test]
async fn test_cancel_clears_marker() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let coord = coordinator_with(
        dir.path(),
        single(Slow(ResourceKind::CloudFront, Duration::from_secs(10))),
        cancel.clone(),
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = coord
        .refresh_sync(ResourceKind::CloudFront, &SilentReporter)
        .await
        .unwrap_err();

    assert!(matches!(err, RefreshError::Canceled(ResourceKind::CloudFront)));
    let meta = coord.store().read_meta().unwrap();
    let svc = meta.service(ResourceKind::CloudFront).unwrap();
    assert!(!svc.refreshing);
    assert_eq!(svc.last_updated, None);
}

#[tokio::test]
async fn test_ensure_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, calls) = Counting::new(ResourceKind::Ec2, 2);
    let coord = coordinator(dir.path(), single(fetcher));

    let first: Vec<Ec2Instance> = coord
        .ensure_fresh(ResourceKind::Ec2, false, &SilentReporter)
        .await
        .unwrap();
    let second: Vec<Ec2Instance> = coord
        .ensure_fresh(ResourceKind::Ec2, false, &SilentReporter)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let _: Vec<Ec2Instance> = coord
        .ensure_fresh(ResourceKind::Ec2, true, &SilentReporter)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_auto_refresh_runs_in_background() {
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, calls) = Counting::new(ResourceKind::Route53Zones, 1);
    let coord = coordinator(dir.path(), single(fetcher));

    assert!(coord.auto_refresh_if_stale(ResourceKind::Route53Zones));
    coord.wait(&CancellationToken::new()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(coord.background_count(), 0);
    // Fresh now, so nothing further starts
    assert!(!coord.auto_refresh_if_stale(ResourceKind::Route53Zones));
}

#[tokio::test]
async fn test_auto_refresh_skips_live_owner() {
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, calls) = Counting::new(ResourceKind::Ec2, 1);
    let coord = coordinator(dir.path(), single(fetcher));
    mark_busy(coord.store(), ResourceKind::Ec2, current_pid());

    assert!(!coord.auto_refresh_if_stale(ResourceKind::Ec2));
    coord.wait(&CancellationToken::new()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auto_refresh_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, calls) = Counting::new(ResourceKind::Ec2, 1);
    let coord = RefreshCoordinator::new(
        CacheStore::new(dir.path()),
        single(fetcher),
        RefreshSettings {
            auto_refresh: false,
            ..Default::default()
        },
        CancellationToken::new(),
    );

    assert!(!coord.auto_refresh_if_stale(ResourceKind::Ec2));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wait_returns_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let coord = coordinator(
        dir.path(),
        single(Slow(ResourceKind::Ec2, Duration::from_secs(30))),
    );
    assert!(coord.auto_refresh_if_stale(ResourceKind::Ec2));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), coord.wait(&cancel))
        .await
        .expect("wait should return once canceled");
    assert_eq!(coord.background_count(), 1);
}

#[tokio::test]
async fn test_shared_cancel_stops_background_refreshes() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let coord = coordinator_with(
        dir.path(),
        single(Slow(ResourceKind::Sqs, Duration::from_secs(30))),
        cancel.clone(),
    );
    assert!(coord.auto_refresh_if_stale(ResourceKind::Sqs));

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), coord.wait(&cancel))
        .await
        .expect("wait should return once canceled");

    tokio::time::timeout(Duration::from_secs(5), async {
        while coord.background_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("background refresh should stop on cancel");

    let meta = coord.store().read_meta().unwrap();
    let svc = meta.service(ResourceKind::Sqs).unwrap();
    assert!(!svc.refreshing);
    assert_eq!(svc.last_updated, None);
}

#[tokio::test]
async fn test_refresh_all_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let (ec2, ec2_calls) = Counting::new(ResourceKind::Ec2, 4);
    let mut registry = FetchRegistry::new();
    registry
        .register(ec2)
        .register(Failing(ResourceKind::CloudFront));
    let coord = coordinator(dir.path(), registry);

    let kinds = [
        ResourceKind::CloudFront,
        ResourceKind::Ec2,
        ResourceKind::Route53Records,
    ];
    let results = coord
        .refresh_all(&kinds, Arc::new(SilentReporter))
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, ResourceKind::CloudFront);
    assert!(matches!(results[0].1, Err(RefreshError::Fetch { .. })));
    assert_eq!(results[1].0, ResourceKind::Ec2);
    assert!(matches!(
        results[1].1,
        Ok(RefreshOutcome::Refreshed { records: 4 })
    ));
    assert!(matches!(
        results[2].1,
        Err(RefreshError::NoFetcher(ResourceKind::Route53Records))
    ));
    assert_eq!(ec2_calls.load(Ordering::SeqCst), 1);

    let meta = coord.store().read_meta().unwrap();
    assert!(meta.service(ResourceKind::Ec2).unwrap().last_updated.is_some());
    assert!(
        meta.service(ResourceKind::CloudFront)
            .unwrap()
            .last_updated
            .is_none()
    );
}

#[tokio::test]
async fn test_refresh_registered() {
    let dir = tempfile::tempdir().unwrap();
    let (ec2, _) = Counting::new(ResourceKind::Ec2, 1);
    let (zones, _) = Counting::new(ResourceKind::Route53Zones, 1);
    let mut registry = FetchRegistry::new();
    registry.register(zones).register(ec2);
    let coord = coordinator(dir.path(), registry);

    let results = coord.refresh_registered().await;
    let kinds: Vec<ResourceKind> = results.iter().map(|(k, _)| *k).collect();
    assert_eq!(kinds, vec![ResourceKind::Ec2, ResourceKind::Route53Zones]);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
}

#[tokio::test]
async fn test_status_classification() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let now = Utc::now();
    let mut meta = CacheMetadata::default();
    meta.mark_refreshed(ResourceKind::Ec2, now - chrono::Duration::minutes(10));
    meta.mark_refreshed(ResourceKind::CloudFront, now - chrono::Duration::hours(3));
    meta.service_mut(ResourceKind::LoadBalancers).refreshing = true;
    meta.service_mut(ResourceKind::LoadBalancers).busy_pid = current_pid();
    // Dead owner: reported by age, not as refreshing
    meta.service_mut(ResourceKind::Route53Records).refreshing = true;
    meta.service_mut(ResourceKind::Route53Records).busy_pid = i32::MAX;
    store.write_meta(&meta).unwrap();

    let coord = coordinator(dir.path(), FetchRegistry::new());
    let status = coord.status(ResourceKind::all());

    assert!(status.last_updated.is_some());
    let get = |kind: ResourceKind| {
        status
            .kinds
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| *s)
            .unwrap()
    };
    assert!(matches!(get(ResourceKind::Ec2), KindStatus::Fresh { .. }));
    assert!(matches!(get(ResourceKind::CloudFront), KindStatus::Stale { age } if age >= Duration::from_secs(3 * 3600)));
    assert_eq!(get(ResourceKind::Route53Zones), KindStatus::Never);
    assert_eq!(get(ResourceKind::Route53Records), KindStatus::Never);
    assert_eq!(
        get(ResourceKind::LoadBalancers),
        KindStatus::Refreshing { pid: current_pid() }
    );
}

//! Handlers for the cache-backed commands

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::cache::CacheStore;
use crate::cloud::{AwsCli, SystemResolver, default_registry};
use crate::config::Config;
use crate::models::{
    Distribution, Ec2Instance, HostedZone, LambdaFunction, LoadBalancer, RdsCluster, RdsInstance,
    RdsRole, ResourceKind, Route53Record, S3Bucket, SqsQueue, SsmParameter,
};
use crate::refresh::{
    ConsoleReporter, KindStatus, RefreshCoordinator, RefreshError, RefreshOutcome,
    RefreshSettings,
};
use crate::trace::{OutputFormat, TraceEngine, render};

/// Everything a command needs, built once from the merged config
pub struct Session {
    config: Config,
    coordinator: RefreshCoordinator,
    cancel: CancellationToken,
    force_refresh: bool,
}

impl Session {
    pub fn new(config: Config, cancel: CancellationToken, force_refresh: bool) -> Result<Self> {
        let ttl = config.ttl_duration()?;
        let cache_dir = config.resolved_cache_dir();
        tracing::debug!("Using cache directory {}", cache_dir.display());

        let registry = default_registry(&config.aws.program, config.route53_max_records);
        let settings = RefreshSettings {
            credentials: config.credentials(),
            ttl,
            auto_refresh: config.auto_refresh,
        };
        let coordinator =
            RefreshCoordinator::new(CacheStore::new(cache_dir), registry, settings, cancel.clone());

        Ok(Self {
            config,
            coordinator,
            cancel,
            force_refresh,
        })
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    fn icons(&self) -> bool {
        !self.config.ui.no_icons
    }

    fn reporter(&self) -> Arc<ConsoleReporter> {
        Arc::new(ConsoleReporter::new(self.icons()))
    }

    /// Trace a domain and print the hop tree
    pub async fn trace(&self, domain: &str) -> Result<()> {
        let inputs = ResourceKind::trace_inputs();

        // Missing snapshots must exist before tracing; stale ones can wait
        let blocking: Vec<ResourceKind> = inputs
            .iter()
            .copied()
            .filter(|&kind| {
                self.force_refresh
                    || self
                        .coordinator
                        .load::<serde_json::Value>(kind)
                        .is_none()
            })
            .collect();
        if !blocking.is_empty() {
            eprintln!("Populating cache for: {}", join_kinds(&blocking));
            let results = self.coordinator.refresh_all(&blocking, self.reporter()).await;
            for (kind, res) in &results {
                if matches!(res, Err(RefreshError::Canceled(_))) {
                    anyhow::bail!("Interrupted while refreshing {}", kind);
                }
            }
        }

        for &kind in inputs {
            if !blocking.contains(&kind) && self.coordinator.auto_refresh_if_stale(kind) {
                eprintln!("{} cache is stale, refreshing in the background", kind);
            }
        }

        let cloud = AwsCli::with_program(&self.config.aws.program, self.config.credentials());
        let resolver = SystemResolver;
        let engine = TraceEngine::new(self.coordinator.store().clone(), &cloud, &resolver);

        let traced = engine.trace(domain, &self.cancel).await;
        // Background refreshes get to finish even when the trace failed
        self.coordinator.wait(&self.cancel).await;

        let result = traced.with_context(|| format!("Failed to trace {}", domain))?;
        println!("{}", render(&result, self.config.ui.output, self.icons())?);
        Ok(())
    }

    /// Refresh the named kinds, or every kind when none are given
    pub async fn refresh(&self, names: &[String]) -> Result<()> {
        let kinds = parse_kinds(names)?;
        let results = self.coordinator.refresh_all(&kinds, self.reporter()).await;

        let mut failed = Vec::new();
        for (kind, res) in &results {
            match res {
                Ok(RefreshOutcome::Refreshed { .. }) => {}
                Ok(RefreshOutcome::AlreadyRefreshing { pid }) => {
                    eprintln!("{} is already being refreshed by process {}", kind, pid);
                }
                Err(_) => failed.push(*kind),
            }
        }

        if !failed.is_empty() {
            anyhow::bail!(
                "{} of {} refreshes failed: {}",
                failed.len(),
                results.len(),
                join_kinds(&failed)
            );
        }
        Ok(())
    }

    /// Print the cache state of every kind
    pub fn status(&self) -> Result<()> {
        let status = self.coordinator.status(ResourceKind::all());

        if self.config.ui.output == OutputFormat::Json {
            let kinds: Vec<StatusEntry> = status
                .kinds
                .iter()
                .map(|&(kind, state)| StatusEntry::new(kind, state))
                .collect();
            let doc = serde_json::json!({
                "cache_dir": self.coordinator.store().dir(),
                "last_updated": status.last_updated,
                "kinds": kinds,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
            return Ok(());
        }

        println!("Cache: {}", self.coordinator.store().dir().display());
        match status.last_updated {
            Some(at) => println!("Last refresh: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Last refresh: never"),
        }
        println!();
        println!("{:<18} {:<12} {}", "KIND", "STATE", "AGE");
        for (kind, state) in status.kinds {
            let entry = StatusEntry::new(kind, state);
            println!(
                "{:<18} {:<12} {}",
                entry.kind.as_str(),
                entry.state,
                entry.detail.unwrap_or_else(|| "-".to_string())
            );
        }
        Ok(())
    }

    /// Print one kind's cached records, populating the cache if empty
    pub async fn list(&self, name: &str) -> Result<()> {
        let kind = parse_kind(name)?;

        if self.config.ui.output == OutputFormat::Json {
            let records: Vec<serde_json::Value> = self.fresh(kind).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        let lines = match kind {
            ResourceKind::Ec2 => self.lines(kind, ec2_line).await?,
            ResourceKind::CloudFront => self.lines(kind, distribution_line).await?,
            ResourceKind::Route53Zones => self.lines(kind, zone_line).await?,
            ResourceKind::Route53Records => self.lines(kind, record_line).await?,
            ResourceKind::LoadBalancers => self.lines(kind, load_balancer_line).await?,
            ResourceKind::S3 => self.lines(kind, bucket_line).await?,
            ResourceKind::Lambda => self.lines(kind, function_line).await?,
            ResourceKind::Sqs => self.lines(kind, queue_line).await?,
            ResourceKind::Ssm => self.lines(kind, parameter_line).await?,
            ResourceKind::RdsClusters => self.lines(kind, rds_cluster_line).await?,
            ResourceKind::RdsInstances => self.lines(kind, rds_instance_line).await?,
        };
        if lines.is_empty() {
            eprintln!("No {} records cached", kind);
        }
        for line in lines {
            println!("{}", line);
        }

        self.coordinator.auto_refresh_if_stale(kind);
        self.coordinator.wait(&self.cancel).await;
        Ok(())
    }

    /// Print the decrypted value of one SSM parameter; values are never cached
    pub async fn ssm_get(&self, name: &str) -> Result<()> {
        let cloud = AwsCli::with_program(&self.config.aws.program, self.config.credentials());
        let value = tokio::select! {
            value = cloud.get_parameter(name) => value,
            _ = self.cancel.cancelled() => anyhow::bail!("Interrupted"),
        };
        let value = value.with_context(|| format!("Failed to get parameter {}", name))?;
        println!("{}", value);
        Ok(())
    }

    async fn fresh<T: DeserializeOwned>(&self, kind: ResourceKind) -> Result<Vec<T>> {
        let reporter = ConsoleReporter::new(self.icons());
        self.coordinator
            .ensure_fresh(kind, self.force_refresh, &reporter)
            .await
            .with_context(|| format!("Failed to load {} records", kind))
    }

    async fn lines<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        line: fn(&T) -> String,
    ) -> Result<Vec<String>> {
        Ok(self.fresh::<T>(kind).await?.iter().map(line).collect())
    }
}

#[derive(Debug, Serialize)]
struct StatusEntry {
    kind: ResourceKind,
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl StatusEntry {
    fn new(kind: ResourceKind, status: KindStatus) -> Self {
        let (state, detail) = match status {
            KindStatus::Never => ("never", None),
            KindStatus::Refreshing { pid } => ("refreshing", Some(format!("pid {}", pid))),
            KindStatus::Fresh { age } => ("fresh", Some(format_age(age))),
            KindStatus::Stale { age } => ("stale", Some(format_age(age))),
        };
        Self {
            kind,
            state,
            detail,
        }
    }
}

/// Parse kind names or aliases; no names means every kind
pub fn parse_kinds(names: &[String]) -> Result<Vec<ResourceKind>> {
    if names.is_empty() {
        return Ok(ResourceKind::all().to_vec());
    }
    let mut kinds = Vec::new();
    for name in names {
        let kind = parse_kind(name)?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn parse_kind(name: &str) -> Result<ResourceKind> {
    ResourceKind::from_alias(name).with_context(|| {
        let known: Vec<&str> = ResourceKind::all().iter().map(|k| k.as_str()).collect();
        format!("Unknown resource kind '{}' (expected one of: {})", name, known.join(", "))
    })
}

fn join_kinds(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compact age like `3d 4h`, `2h 5m`, `12m` or `40s`
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    let (days, hours, mins) = (secs / 86400, (secs % 86400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}

fn ec2_line(i: &Ec2Instance) -> String {
    format!(
        "{:<20} {:<28} {:<10} {:<12} {}",
        i.instance_id,
        i.display_name(),
        i.state,
        i.instance_type,
        i.private_ip
    )
}

fn distribution_line(d: &Distribution) -> String {
    format!(
        "{:<15} {:<40} {:<10} {}",
        d.id,
        d.domain,
        d.status,
        d.aliases.join(",")
    )
}

fn zone_line(z: &HostedZone) -> String {
    format!(
        "{:<24} {:<40} {:<8} {}",
        z.bare_id(),
        z.name,
        z.zone_type,
        z.record_count
    )
}

fn record_line(r: &Route53Record) -> String {
    format!(
        "{:<50} {:<6} {:<8} {}",
        r.name, r.record_type, r.ttl, r.value
    )
}

fn load_balancer_line(lb: &LoadBalancer) -> String {
    format!(
        "{:<32} {:<12} {:<16} {}",
        lb.name,
        format!("{:?}", lb.kind).to_lowercase(),
        lb.scheme,
        lb.dns_name
    )
}

fn bucket_line(b: &S3Bucket) -> String {
    format!("{:<48} {:<16} {}", b.name, b.region, b.creation_date)
}

fn function_line(f: &LambdaFunction) -> String {
    format!(
        "{:<48} {:<14} {:>6}MB {:>4}s  {}",
        f.name, f.runtime, f.memory_mb, f.timeout_secs, f.last_modified
    )
}

fn queue_line(q: &SqsQueue) -> String {
    format!("{:<60} {}", q.name, q.queue_type)
}

fn parameter_line(p: &SsmParameter) -> String {
    format!(
        "{:<60} {:<14} {:<20} {}",
        p.name, p.parameter_type, p.last_modified, p.modified_by
    )
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn rds_cluster_line(c: &RdsCluster) -> String {
    format!(
        "{:<32} {:<12} {:<20} {:<10} multi-az:{:<4} public:{:<4} {}",
        c.identifier,
        c.status,
        c.engine,
        c.engine_version,
        yes_no(c.multi_az),
        yes_no(c.publicly_accessible),
        c.instance_count
    )
}

fn rds_instance_line(i: &RdsInstance) -> String {
    let role = match i.role {
        RdsRole::Writer => "writer",
        RdsRole::Reader => "reader",
    };
    format!(
        "{:<28} {:<32} {:<7} {:<20} {:<12} {:<16} {}",
        i.cluster.as_deref().unwrap_or("standalone"),
        i.identifier,
        role,
        i.engine,
        i.status,
        i.instance_class,
        i.availability_zone
    )
}

//! Provider backed by the `aws` command line tool
//!
//! Each call runs `aws <service> <operation> ... --output json` with the
//! configured profile and region, then decodes stdout into the private
//! `wire` types below. The CLI paginates list calls on its own unless
//! `--max-items` is passed.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::process::Stdio;
use tokio::process::Command;

use super::{CloudApi, Credentials, FetchRegistry, Fetcher};
use crate::models::{
    Action, CacheBehavior, ClassicLoadBalancerDetails, Condition, Distribution, Ec2Instance,
    HostedZone, LambdaFunction, Listener, LoadBalancer, LoadBalancerKind, RdsCluster, RdsInstance,
    RdsRole, RecordSetPage, ResourceKind, Route53Record, Rule, S3Bucket, SqsQueue, SsmParameter,
    TargetHealth,
};

/// Default executable name
pub const AWS_PROGRAM: &str = "aws";

/// Record sets requested per page
const RECORD_PAGE_SIZE: u32 = 300;

/// Zones whose records are listed at the same time
const ZONE_CONCURRENCY: usize = 5;

/// Thin async wrapper around the `aws` executable
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
    credentials: Credentials,
}

impl AwsCli {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_program(AWS_PROGRAM, credentials)
    }

    pub fn with_program(program: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            program: program.into(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Run one CLI operation and decode its JSON output
    async fn call<T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        args: &[&str],
    ) -> Result<T> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(service).arg(operation).args(args);
        cmd.args(["--output", "json"]);
        if let Some(profile) = &self.credentials.profile {
            cmd.args(["--profile", profile]);
        }
        if let Some(region) = &self.credentials.region {
            cmd.args(["--region", region]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Running {} {} {}", self.program, service, operation);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} {} failed ({}): {}",
                service,
                operation,
                output.status,
                stderr.trim()
            );
        }

        // Some operations print nothing when there is nothing to report
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_str("{}")
                .with_context(|| format!("Empty output from {} {}", service, operation));
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Failed to parse {} {} output", service, operation))
    }

    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let out: wire::HostedZoneList = self.call("route53", "list-hosted-zones", &[]).await?;
        Ok(out
            .hosted_zones
            .into_iter()
            .map(|z| HostedZone {
                id: z.id,
                name: z.name,
                zone_type: if z.config.private_zone {
                    "private".to_string()
                } else {
                    "public".to_string()
                },
                record_count: z.resource_record_set_count,
            })
            .collect())
    }

    /// Decrypted value of one SSM parameter
    pub async fn get_parameter(&self, name: &str) -> Result<String> {
        let out: wire::GetParameterOutput = self
            .call(
                "ssm",
                "get-parameter",
                &["--name", name, "--with-decryption"],
            )
            .await?;
        Ok(out.parameter.value)
    }

    async fn describe_db_clusters(&self) -> Result<Vec<wire::DbCluster>> {
        let out: wire::DbClusterList = self.call("rds", "describe-db-clusters", &[]).await?;
        Ok(out.db_clusters)
    }

    /// Every record set of one zone, following page tokens
    async fn list_zone_records(&self, zone: &HostedZone) -> Result<Vec<Route53Record>> {
        let mut records = Vec::new();
        let mut token = None;
        loop {
            let page = self.list_record_sets(zone.bare_id(), token).await?;
            records.extend(page.records.into_iter().map(|mut r| {
                r.zone_name = zone.name.clone();
                r
            }));
            match page.next_token {
                Some(next) => token = Some(next),
                None => return Ok(records),
            }
        }
    }
}

#[async_trait]
impl CloudApi for AwsCli {
    async fn list_record_sets(
        &self,
        zone_id: &str,
        page_token: Option<String>,
    ) -> Result<RecordSetPage> {
        let page_size = RECORD_PAGE_SIZE.to_string();
        let mut args = vec!["--hosted-zone-id", zone_id, "--max-items", page_size.as_str()];
        if let Some(token) = page_token.as_deref() {
            args.extend(["--starting-token", token]);
        }

        let out: wire::RecordSetList = self
            .call("route53", "list-resource-record-sets", &args)
            .await?;

        Ok(RecordSetPage {
            records: out
                .resource_record_sets
                .into_iter()
                .map(|r| r.into_record(""))
                .collect(),
            next_token: out.next_token.filter(|t| !t.is_empty()),
        })
    }

    async fn describe_listeners(&self, load_balancer_arn: &str) -> Result<Vec<Listener>> {
        let out: wire::ListenerList = self
            .call(
                "elbv2",
                "describe-listeners",
                &["--load-balancer-arn", load_balancer_arn],
            )
            .await?;
        Ok(out.listeners.into_iter().map(Listener::from).collect())
    }

    async fn describe_rules(&self, listener_arn: &str) -> Result<Vec<Rule>> {
        let out: wire::RuleList = self
            .call("elbv2", "describe-rules", &["--listener-arn", listener_arn])
            .await?;
        Ok(out.rules.into_iter().map(Rule::from).collect())
    }

    async fn describe_target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>> {
        let out: wire::TargetHealthList = self
            .call(
                "elbv2",
                "describe-target-health",
                &["--target-group-arn", target_group_arn],
            )
            .await?;
        Ok(out
            .target_health_descriptions
            .into_iter()
            .map(|d| TargetHealth {
                target_id: d.target.id,
                state: d.target_health.state,
                reason: d.target_health.reason,
            })
            .collect())
    }

    async fn describe_classic_load_balancer(
        &self,
        name: &str,
    ) -> Result<ClassicLoadBalancerDetails> {
        let out: wire::ClassicLoadBalancerList = self
            .call(
                "elb",
                "describe-load-balancers",
                &["--load-balancer-names", name],
            )
            .await?;
        let Some(lb) = out.load_balancer_descriptions.into_iter().next() else {
            bail!("Load balancer {} not found", name);
        };

        let listeners = lb
            .listener_descriptions
            .into_iter()
            .map(|d| Listener {
                arn: String::new(),
                protocol: d.listener.protocol,
                port: d.listener.load_balancer_port,
                default_actions: Vec::new(),
            })
            .collect();

        let health: Result<wire::InstanceHealthList> = self
            .call(
                "elb",
                "describe-instance-health",
                &["--load-balancer-name", name],
            )
            .await;

        let instances = match health {
            Ok(health) => health
                .instance_states
                .into_iter()
                .map(|s| TargetHealth {
                    target_id: s.instance_id,
                    state: s.state,
                    reason: s.description,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Instance health unavailable for {}: {:#}", name, e);
                lb.instances
                    .into_iter()
                    .map(|i| TargetHealth {
                        target_id: i.instance_id,
                        ..Default::default()
                    })
                    .collect()
            }
        };

        Ok(ClassicLoadBalancerDetails {
            listeners,
            instances,
        })
    }
}

/// Lists EC2 instances
#[derive(Debug, Clone)]
pub struct Ec2Fetcher {
    program: String,
}

/// Lists CloudFront distributions
#[derive(Debug, Clone)]
pub struct DistributionFetcher {
    program: String,
}

/// Lists Route53 hosted zones
#[derive(Debug, Clone)]
pub struct HostedZoneFetcher {
    program: String,
}

/// Lists record sets across every hosted zone
#[derive(Debug, Clone)]
pub struct RecordFetcher {
    program: String,
    /// Zones with more record sets than this are skipped; 0 disables the limit
    max_records: i64,
}

/// Lists application, network and classic load balancers
#[derive(Debug, Clone)]
pub struct LoadBalancerFetcher {
    program: String,
}

/// Lists S3 buckets
#[derive(Debug, Clone)]
pub struct S3Fetcher {
    program: String,
}

/// Lists Lambda functions
#[derive(Debug, Clone)]
pub struct LambdaFetcher {
    program: String,
}

/// Lists SQS queues
#[derive(Debug, Clone)]
pub struct SqsFetcher {
    program: String,
}

/// Lists SSM parameter metadata
#[derive(Debug, Clone)]
pub struct SsmFetcher {
    program: String,
}

/// Lists RDS clusters
#[derive(Debug, Clone)]
pub struct RdsClusterFetcher {
    program: String,
}

/// Lists RDS instances with their cluster role
#[derive(Debug, Clone)]
pub struct RdsInstanceFetcher {
    program: String,
}

macro_rules! impl_cli_fetcher {
    ($($fetcher:ident),*) => {
        $(
            impl $fetcher {
                pub fn new(program: impl Into<String>) -> Self {
                    Self {
                        program: program.into(),
                    }
                }

                fn cli(&self, credentials: &Credentials) -> AwsCli {
                    AwsCli::with_program(self.program.clone(), credentials.clone())
                }
            }

            impl Default for $fetcher {
                fn default() -> Self {
                    Self::new(AWS_PROGRAM)
                }
            }
        )*
    };
}

impl_cli_fetcher!(
    Ec2Fetcher,
    DistributionFetcher,
    HostedZoneFetcher,
    LoadBalancerFetcher,
    S3Fetcher,
    LambdaFetcher,
    SqsFetcher,
    SsmFetcher,
    RdsClusterFetcher,
    RdsInstanceFetcher
);

impl Default for RecordFetcher {
    fn default() -> Self {
        Self::new(AWS_PROGRAM)
    }
}

impl RecordFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            max_records: crate::config::defaults::default_route53_max_records(),
        }
    }

    pub fn with_max_records(mut self, max_records: i64) -> Self {
        self.max_records = max_records;
        self
    }

    fn include_zone(&self, zone: &HostedZone) -> bool {
        self.max_records <= 0 || zone.record_count <= self.max_records
    }

    fn cli(&self, credentials: &Credentials) -> AwsCli {
        AwsCli::with_program(self.program.clone(), credentials.clone())
    }
}

#[async_trait]
impl Fetcher for Ec2Fetcher {
    type Record = Ec2Instance;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Ec2
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<Ec2Instance>> {
        let out: wire::Reservations = self
            .cli(credentials)
            .call("ec2", "describe-instances", &[])
            .await?;

        Ok(out
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(|inst| Ec2Instance {
                name: inst
                    .tags
                    .iter()
                    .find(|t| t.key == "Name")
                    .map(|t| t.value.clone())
                    .unwrap_or_default(),
                instance_id: inst.instance_id,
                state: inst.state.name,
                instance_type: inst.instance_type,
                availability_zone: inst.placement.availability_zone,
                private_ip: inst.private_ip_address,
                public_ip: inst.public_ip_address,
                launch_time: inst.launch_time,
            })
            .collect())
    }
}

#[async_trait]
impl Fetcher for DistributionFetcher {
    type Record = Distribution;

    fn kind(&self) -> ResourceKind {
        ResourceKind::CloudFront
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<Distribution>> {
        let out: wire::DistributionListOutput = self
            .cli(credentials)
            .call("cloudfront", "list-distributions", &[])
            .await?;

        Ok(out
            .distribution_list
            .items
            .into_iter()
            .map(Distribution::from)
            .collect())
    }
}

#[async_trait]
impl Fetcher for HostedZoneFetcher {
    type Record = HostedZone;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Route53Zones
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<HostedZone>> {
        self.cli(credentials).list_hosted_zones().await
    }
}

#[async_trait]
impl Fetcher for RecordFetcher {
    type Record = Route53Record;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Route53Records
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<Route53Record>> {
        let cli = self.cli(credentials);
        let zones = cli.list_hosted_zones().await?;

        let (included, skipped): (Vec<_>, Vec<_>) =
            zones.into_iter().partition(|z| self.include_zone(z));
        for zone in &skipped {
            tracing::info!(
                "Skipping zone {} with {} records (limit {})",
                zone.name,
                zone.record_count,
                self.max_records
            );
        }

        // A failing zone keeps whatever it listed so far out of the snapshot
        // but does not fail the other zones
        let per_zone: Vec<Vec<Route53Record>> = stream::iter(included)
            .map(|zone| {
                let cli = &cli;
                async move {
                    match cli.list_zone_records(&zone).await {
                        Ok(records) => records,
                        Err(e) => {
                            tracing::warn!("Failed to list records of {}: {:#}", zone.name, e);
                            Vec::new()
                        }
                    }
                }
            })
            .buffered(ZONE_CONCURRENCY)
            .collect()
            .await;

        Ok(per_zone.into_iter().flatten().collect())
    }
}

#[async_trait]
impl Fetcher for LoadBalancerFetcher {
    type Record = LoadBalancer;

    fn kind(&self) -> ResourceKind {
        ResourceKind::LoadBalancers
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<LoadBalancer>> {
        let cli = self.cli(credentials);
        let (v2, classic) = tokio::join!(
            cli.call::<wire::LoadBalancerList>("elbv2", "describe-load-balancers", &[]),
            cli.call::<wire::ClassicLoadBalancerList>("elb", "describe-load-balancers", &[]),
        );

        let mut lbs = Vec::new();
        match (v2, classic) {
            (Err(v2_err), Err(classic_err)) => {
                tracing::warn!("Classic load balancer listing failed: {:#}", classic_err);
                return Err(v2_err);
            }
            (v2, classic) => {
                match v2 {
                    Ok(out) => lbs.extend(out.load_balancers.into_iter().map(LoadBalancer::from)),
                    Err(e) => tracing::warn!("Load balancer listing failed: {:#}", e),
                }
                match classic {
                    Ok(out) => lbs.extend(
                        out.load_balancer_descriptions
                            .into_iter()
                            .map(LoadBalancer::from),
                    ),
                    Err(e) => tracing::warn!("Classic load balancer listing failed: {:#}", e),
                }
            }
        }
        Ok(lbs)
    }
}

#[async_trait]
impl Fetcher for S3Fetcher {
    type Record = S3Bucket;

    fn kind(&self) -> ResourceKind {
        ResourceKind::S3
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<S3Bucket>> {
        let out: wire::BucketList = self
            .cli(credentials)
            .call("s3api", "list-buckets", &[])
            .await?;
        Ok(out.buckets.into_iter().map(S3Bucket::from).collect())
    }
}

#[async_trait]
impl Fetcher for LambdaFetcher {
    type Record = LambdaFunction;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Lambda
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<LambdaFunction>> {
        let out: wire::FunctionList = self
            .cli(credentials)
            .call("lambda", "list-functions", &[])
            .await?;
        Ok(out.functions.into_iter().map(LambdaFunction::from).collect())
    }
}

#[async_trait]
impl Fetcher for SqsFetcher {
    type Record = SqsQueue;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Sqs
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<SqsQueue>> {
        // Prints nothing at all when the account has no queues
        let out: wire::QueueList = self
            .cli(credentials)
            .call("sqs", "list-queues", &[])
            .await?;
        Ok(out.queue_urls.iter().map(|url| SqsQueue::from_url(url)).collect())
    }
}

#[async_trait]
impl Fetcher for SsmFetcher {
    type Record = SsmParameter;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Ssm
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<SsmParameter>> {
        let out: wire::ParameterList = self
            .cli(credentials)
            .call("ssm", "describe-parameters", &[])
            .await?;
        Ok(out.parameters.into_iter().map(SsmParameter::from).collect())
    }
}

#[async_trait]
impl Fetcher for RdsClusterFetcher {
    type Record = RdsCluster;

    fn kind(&self) -> ResourceKind {
        ResourceKind::RdsClusters
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<RdsCluster>> {
        let clusters = self.cli(credentials).describe_db_clusters().await?;
        Ok(clusters.into_iter().map(RdsCluster::from).collect())
    }
}

#[async_trait]
impl Fetcher for RdsInstanceFetcher {
    type Record = RdsInstance;

    fn kind(&self) -> ResourceKind {
        ResourceKind::RdsInstances
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<RdsInstance>> {
        let cli = self.cli(credentials);
        let (clusters, instances) = tokio::try_join!(
            cli.describe_db_clusters(),
            cli.call::<wire::DbInstanceList>("rds", "describe-db-instances", &[]),
        )?;
        Ok(rds_instances(&clusters, instances.db_instances))
    }
}

/// Registry with the CLI-backed fetcher for every cached kind
pub fn default_registry(program: &str, route53_max_records: i64) -> FetchRegistry {
    let mut registry = FetchRegistry::new();
    registry
        .register(Ec2Fetcher::new(program))
        .register(DistributionFetcher::new(program))
        .register(HostedZoneFetcher::new(program))
        .register(RecordFetcher::new(program).with_max_records(route53_max_records))
        .register(LoadBalancerFetcher::new(program))
        .register(S3Fetcher::new(program))
        .register(LambdaFetcher::new(program))
        .register(SqsFetcher::new(program))
        .register(SsmFetcher::new(program))
        .register(RdsClusterFetcher::new(program))
        .register(RdsInstanceFetcher::new(program));
    registry
}

/// Attach cluster roles to instances; standalone instances count as writers
fn rds_instances(
    clusters: &[wire::DbCluster],
    instances: Vec<wire::DbInstance>,
) -> Vec<RdsInstance> {
    let roles: std::collections::HashMap<&str, RdsRole> = clusters
        .iter()
        .flat_map(|c| &c.db_cluster_members)
        .map(|m| {
            let role = if m.is_cluster_writer {
                RdsRole::Writer
            } else {
                RdsRole::Reader
            };
            (m.db_instance_identifier.as_str(), role)
        })
        .collect();

    instances
        .into_iter()
        .map(|db| RdsInstance {
            role: roles
                .get(db.db_instance_identifier.as_str())
                .copied()
                .unwrap_or(RdsRole::Writer),
            cluster: db.db_cluster_identifier.filter(|c| !c.is_empty()),
            identifier: db.db_instance_identifier,
            engine: db.engine,
            engine_version: db.engine_version,
            status: db.db_instance_status,
            endpoint: db.endpoint.map(|e| e.address).unwrap_or_default(),
            instance_class: db.db_instance_class,
            availability_zone: db.availability_zone,
        })
        .collect()
}

/// Short principal name from an IAM ARN
///
/// `assumed-role/Role/Session` keeps the role, other resources keep their
/// last path segment, and anything that is not an AWS ARN is returned as is.
fn shorten_arn(arn: &str) -> String {
    if !arn.starts_with("arn:aws:") {
        return arn.to_string();
    }
    let resource = arn.rsplit(':').next().unwrap_or(arn);
    let mut parts = resource.split('/');
    if let (Some("assumed-role"), Some(role)) = (parts.next(), parts.next()) {
        return format!("assumed-role/{}", role);
    }
    resource.rsplit('/').next().unwrap_or(resource).to_string()
}

/// Render a CLI timestamp as `YYYY-MM-DD HH:MM:SS`, keeping unparsable input
fn short_timestamp(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(at) => at
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

fn load_balancer_kind(raw: &str) -> LoadBalancerKind {
    match raw {
        "application" => LoadBalancerKind::Application,
        "network" => LoadBalancerKind::Network,
        "classic" => LoadBalancerKind::Classic,
        _ => LoadBalancerKind::Other,
    }
}

/// Append values not already present, keeping first-seen order
fn push_unique(into: &mut Vec<String>, values: impl IntoIterator<Item = String>) {
    for value in values {
        if !into.contains(&value) {
            into.push(value);
        }
    }
}

impl From<wire::Action> for Action {
    fn from(a: wire::Action) -> Self {
        let mut target_group_arns = Vec::new();
        push_unique(&mut target_group_arns, a.target_group_arn);
        if let Some(forward) = a.forward_config {
            push_unique(
                &mut target_group_arns,
                forward.target_groups.into_iter().map(|t| t.target_group_arn),
            );
        }
        Action {
            action_type: a.kind,
            target_group_arns,
        }
    }
}

impl From<wire::Listener> for Listener {
    fn from(l: wire::Listener) -> Self {
        Listener {
            arn: l.listener_arn,
            protocol: l.protocol,
            port: l.port,
            default_actions: l.default_actions.into_iter().map(Action::from).collect(),
        }
    }
}

impl From<wire::Rule> for Rule {
    fn from(r: wire::Rule) -> Self {
        Rule {
            arn: r.rule_arn,
            priority: r.priority,
            is_default: r.is_default,
            conditions: r
                .conditions
                .into_iter()
                .map(|c| {
                    let mut values = Vec::new();
                    push_unique(&mut values, c.values);
                    if let Some(host) = c.host_header_config {
                        push_unique(&mut values, host.values);
                    }
                    if let Some(path) = c.path_pattern_config {
                        push_unique(&mut values, path.values);
                    }
                    Condition {
                        field: c.field,
                        values,
                    }
                })
                .collect(),
            actions: r.actions.into_iter().map(Action::from).collect(),
        }
    }
}

impl From<wire::LoadBalancer> for LoadBalancer {
    fn from(lb: wire::LoadBalancer) -> Self {
        LoadBalancer {
            kind: load_balancer_kind(&lb.kind),
            name: lb.load_balancer_name,
            scheme: lb.scheme,
            created_at: lb.created_time,
            dns_name: lb.dns_name,
            arn: lb.load_balancer_arn,
        }
    }
}

impl From<wire::ClassicLoadBalancer> for LoadBalancer {
    fn from(lb: wire::ClassicLoadBalancer) -> Self {
        LoadBalancer {
            kind: LoadBalancerKind::Classic,
            name: lb.load_balancer_name,
            scheme: lb.scheme,
            created_at: lb.created_time,
            dns_name: lb.dns_name,
            arn: String::new(),
        }
    }
}

impl From<wire::Distribution> for Distribution {
    fn from(d: wire::Distribution) -> Self {
        let origins: std::collections::BTreeMap<String, String> = d
            .origins
            .items
            .into_iter()
            .map(|o| (o.id, o.domain_name))
            .collect();
        let default_id = d.default_cache_behavior.target_origin_id;
        let default_origin = origins
            .get(&default_id)
            .cloned()
            .unwrap_or(default_id);

        Distribution {
            id: d.id,
            domain: d.domain_name,
            status: d.status,
            aliases: d.aliases.items,
            last_updated: d.last_modified_time,
            origins,
            default_origin,
            behaviors: d
                .cache_behaviors
                .items
                .into_iter()
                .map(|b| CacheBehavior {
                    path_pattern: b.path_pattern,
                    target_origin_id: b.target_origin_id,
                })
                .collect(),
        }
    }
}

impl From<wire::Bucket> for S3Bucket {
    fn from(b: wire::Bucket) -> Self {
        S3Bucket {
            name: b.name,
            region: b.bucket_region,
            creation_date: b.creation_date,
        }
    }
}

impl From<wire::Function> for LambdaFunction {
    fn from(f: wire::Function) -> Self {
        LambdaFunction {
            name: f.function_name,
            runtime: f.runtime,
            last_modified: f.last_modified,
            memory_mb: f.memory_size,
            timeout_secs: f.timeout,
        }
    }
}

impl From<wire::Parameter> for SsmParameter {
    fn from(p: wire::Parameter) -> Self {
        SsmParameter {
            name: p.name,
            parameter_type: p.kind,
            last_modified: short_timestamp(&p.last_modified_date),
            modified_by: shorten_arn(&p.last_modified_user),
        }
    }
}

impl From<wire::DbCluster> for RdsCluster {
    fn from(c: wire::DbCluster) -> Self {
        RdsCluster {
            identifier: c.db_cluster_identifier,
            status: c.status,
            engine: c.engine,
            engine_version: c.engine_version,
            multi_az: c.multi_az,
            publicly_accessible: c.publicly_accessible,
            instance_count: c.db_cluster_members.len(),
            storage_type: c.storage_type,
            created_at: short_timestamp(&c.cluster_create_time),
        }
    }
}

/// JSON shapes printed by the CLI
mod wire {
    use serde::Deserialize;

    use crate::models::Route53Record;

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Reservations {
        pub reservations: Vec<Reservation>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Reservation {
        pub instances: Vec<Instance>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Instance {
        pub instance_id: String,
        pub instance_type: String,
        pub state: InstanceState,
        pub placement: Placement,
        pub private_ip_address: String,
        pub public_ip_address: String,
        pub launch_time: String,
        pub tags: Vec<Tag>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct InstanceState {
        pub name: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Placement {
        pub availability_zone: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Tag {
        pub key: String,
        pub value: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct DistributionListOutput {
        pub distribution_list: DistributionList,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct DistributionList {
        pub items: Vec<Distribution>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Distribution {
        pub id: String,
        pub domain_name: String,
        pub status: String,
        pub last_modified_time: String,
        pub aliases: Items<String>,
        pub origins: Items<Origin>,
        pub default_cache_behavior: DefaultCacheBehavior,
        pub cache_behaviors: Items<CacheBehavior>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Items<T> {
        pub items: Vec<T>,
    }

    impl<T> Default for Items<T> {
        fn default() -> Self {
            Self { items: Vec::new() }
        }
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Origin {
        pub id: String,
        pub domain_name: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct DefaultCacheBehavior {
        pub target_origin_id: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct CacheBehavior {
        pub path_pattern: String,
        pub target_origin_id: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct HostedZoneList {
        pub hosted_zones: Vec<HostedZone>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct HostedZone {
        pub id: String,
        pub name: String,
        pub config: HostedZoneConfig,
        pub resource_record_set_count: i64,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct HostedZoneConfig {
        pub private_zone: bool,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct RecordSetList {
        pub resource_record_sets: Vec<RecordSet>,
        pub next_token: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct RecordSet {
        pub name: String,
        #[serde(rename = "Type")]
        pub kind: String,
        #[serde(rename = "TTL")]
        pub ttl: Option<i64>,
        pub resource_records: Vec<ResourceRecord>,
        pub alias_target: Option<AliasTarget>,
    }

    impl RecordSet {
        pub fn into_record(self, zone_name: &str) -> Route53Record {
            let ttl = match self.ttl {
                Some(ttl) => ttl.to_string(),
                None => "ALIAS".to_string(),
            };
            let (record_type, value) = match self.alias_target {
                Some(alias) => (format!("Alias+{}", self.kind), alias.dns_name),
                None => (
                    self.kind,
                    self.resource_records
                        .into_iter()
                        .next()
                        .map(|r| r.value)
                        .unwrap_or_default(),
                ),
            };
            Route53Record {
                zone_name: zone_name.to_string(),
                name: self.name,
                record_type,
                ttl,
                value,
            }
        }
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ResourceRecord {
        pub value: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct AliasTarget {
        #[serde(rename = "DNSName")]
        pub dns_name: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct LoadBalancerList {
        pub load_balancers: Vec<LoadBalancer>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct LoadBalancer {
        pub load_balancer_arn: String,
        pub load_balancer_name: String,
        #[serde(rename = "DNSName")]
        pub dns_name: String,
        pub scheme: String,
        pub created_time: String,
        #[serde(rename = "Type")]
        pub kind: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ClassicLoadBalancerList {
        pub load_balancer_descriptions: Vec<ClassicLoadBalancer>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ClassicLoadBalancer {
        pub load_balancer_name: String,
        #[serde(rename = "DNSName")]
        pub dns_name: String,
        pub scheme: String,
        pub created_time: String,
        pub listener_descriptions: Vec<ListenerDescription>,
        pub instances: Vec<ClassicInstance>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ListenerDescription {
        pub listener: ClassicListener,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ClassicListener {
        pub protocol: String,
        pub load_balancer_port: i32,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ClassicInstance {
        pub instance_id: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct InstanceHealthList {
        pub instance_states: Vec<InstanceHealthState>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct InstanceHealthState {
        pub instance_id: String,
        pub state: String,
        pub description: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ListenerList {
        pub listeners: Vec<Listener>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Listener {
        pub listener_arn: String,
        pub protocol: String,
        pub port: i32,
        pub default_actions: Vec<Action>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Action {
        #[serde(rename = "Type")]
        pub kind: String,
        pub target_group_arn: Option<String>,
        pub forward_config: Option<ForwardConfig>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ForwardConfig {
        pub target_groups: Vec<WeightedTargetGroup>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct WeightedTargetGroup {
        pub target_group_arn: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct RuleList {
        pub rules: Vec<Rule>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Rule {
        pub rule_arn: String,
        pub priority: String,
        pub is_default: bool,
        pub conditions: Vec<RuleCondition>,
        pub actions: Vec<Action>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct RuleCondition {
        pub field: String,
        pub values: Vec<String>,
        pub host_header_config: Option<ValuesConfig>,
        pub path_pattern_config: Option<ValuesConfig>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ValuesConfig {
        pub values: Vec<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct TargetHealthList {
        pub target_health_descriptions: Vec<TargetHealthDescription>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct TargetHealthDescription {
        pub target: Target,
        pub target_health: TargetHealthState,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Target {
        pub id: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct TargetHealthState {
        pub state: String,
        pub reason: String,
    }
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct BucketList {
        pub buckets: Vec<Bucket>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Bucket {
        pub name: String,
        pub creation_date: String,
        pub bucket_region: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct FunctionList {
        pub functions: Vec<Function>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Function {
        pub function_name: String,
        pub runtime: String,
        pub last_modified: String,
        pub memory_size: i64,
        pub timeout: i64,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct QueueList {
        pub queue_urls: Vec<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ParameterList {
        pub parameters: Vec<Parameter>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Parameter {
        pub name: String,
        #[serde(rename = "Type")]
        pub kind: String,
        pub last_modified_date: String,
        pub last_modified_user: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct GetParameterOutput {
        pub parameter: ParameterValue,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct ParameterValue {
        pub value: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct DbClusterList {
        #[serde(rename = "DBClusters")]
        pub db_clusters: Vec<DbCluster>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct DbCluster {
        #[serde(rename = "DBClusterIdentifier")]
        pub db_cluster_identifier: String,
        pub status: String,
        pub engine: String,
        pub engine_version: String,
        #[serde(rename = "MultiAZ")]
        pub multi_az: bool,
        pub publicly_accessible: bool,
        pub storage_type: String,
        pub cluster_create_time: String,
        #[serde(rename = "DBClusterMembers")]
        pub db_cluster_members: Vec<DbClusterMember>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct DbClusterMember {
        #[serde(rename = "DBInstanceIdentifier")]
        pub db_instance_identifier: String,
        pub is_cluster_writer: bool,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct DbInstanceList {
        #[serde(rename = "DBInstances")]
        pub db_instances: Vec<DbInstance>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct DbInstance {
        #[serde(rename = "DBInstanceIdentifier")]
        pub db_instance_identifier: String,
        #[serde(rename = "DBClusterIdentifier")]
        pub db_cluster_identifier: Option<String>,
        pub engine: String,
        pub engine_version: String,
        #[serde(rename = "DBInstanceStatus")]
        pub db_instance_status: String,
        #[serde(rename = "DBInstanceClass")]
        pub db_instance_class: String,
        pub availability_zone: String,
        pub endpoint: Option<Endpoint>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "PascalCase", default)]
    pub struct Endpoint {
        pub address: String,
    }
}

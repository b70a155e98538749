//! Core trace implementation

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::TraceError;
use super::glob;
use super::models::{HopStatus, NodeType, TraceNode, TraceResult};
use super::rules::{evaluate, rule_label, sort_rules};
use super::target_group::{INSTANCE_HEALTHY, InstanceNames, member_node, trace_target_group};
use crate::cache::CacheStore;
use crate::cloud::{CloudApi, DnsResolver};
use crate::models::{
    Distribution, Ec2Instance, HostedZone, Listener, LoadBalancer, LoadBalancerKind,
    ResourceKind, Route53Record,
};

/// Deadline for one whole trace
pub const TRACE_TIMEOUT: Duration = Duration::from_secs(30);

/// Split a domain or URL into host and path
///
/// Strips one trailing dot and an `http://` or `https://` prefix. The path
/// keeps its leading slash and defaults to `/`.
pub fn normalize(domain: &str) -> (String, String) {
    let input = domain.strip_suffix('.').unwrap_or(domain);
    let input = input.strip_prefix("https://").unwrap_or(input);
    let input = input.strip_prefix("http://").unwrap_or(input);

    match input.split_once('/') {
        Some((host, rest)) => (host.to_string(), format!("/{}", rest)),
        None => (input.to_string(), "/".to_string()),
    }
}

/// DNS names compare case-insensitively and ignore a trailing dot
fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Hosted zone with the longest name that is a label suffix of `host`
fn best_zone<'a>(zones: &'a [HostedZone], host: &str) -> Option<&'a HostedZone> {
    let host = host.to_ascii_lowercase();
    let mut best: Option<&HostedZone> = None;
    for zone in zones {
        let name = zone.name.trim_end_matches('.').to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let is_suffix = host == name || host.ends_with(&format!(".{}", name));
        let longer = best.is_none_or(|b| zone.name.len() > b.name.len());
        if is_suffix && longer {
            best = Some(zone);
        }
    }
    best
}

/// Walks a domain through DNS, CloudFront and load balancers
///
/// Snapshots come from the cache as-is; freshness is the caller's concern.
/// Listener, rule and health details are looked up live and never cached.
pub struct TraceEngine<'a> {
    store: CacheStore,
    cloud: &'a dyn CloudApi,
    resolver: &'a dyn DnsResolver,
    timeout: Duration,
}

impl<'a> TraceEngine<'a> {
    pub fn new(store: CacheStore, cloud: &'a dyn CloudApi, resolver: &'a dyn DnsResolver) -> Self {
        Self {
            store,
            cloud,
            resolver,
            timeout: TRACE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Trace one domain or URL
    ///
    /// Fails only when record resolution fails, the deadline passes, or
    /// `cancel` fires. Everything deeper degrades the tree instead.
    pub async fn trace(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<TraceResult, TraceError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(TraceError::Canceled),
            res = tokio::time::timeout(self.timeout, self.run(domain)) => match res {
                Ok(result) => result,
                Err(_) => Err(TraceError::Timeout(self.timeout)),
            },
        }
    }

    async fn run(&self, domain: &str) -> Result<TraceResult, TraceError> {
        let (host, path) = normalize(domain);
        tracing::debug!("Tracing host={} path={}", host, path);

        let mut result = TraceResult {
            domain: domain.to_string(),
            hops: Vec::new(),
        };

        let Some(record) = self.resolve_record(&host).await? else {
            result.hops.push(self.external_dns(&host).await);
            return Ok(result);
        };

        let mut record_hop = TraceNode::new(NodeType::Route53, record.name.clone())
            .with_id(record.zone_name.clone())
            .with_value(format!("{} ({})", record.value, record.record_type));
        let target = record.value.trim_end_matches('.');

        if let Some(hop) = self.match_distribution(target, &path) {
            record_hop.children.push(hop);
        } else if let Some(lb) = self.match_load_balancer(target) {
            record_hop.children.push(self.trace_load_balancer(&lb, &host, &path).await);
        }

        result.hops.push(record_hop);
        Ok(result)
    }

    /// Find the record for `host`: cached records first, then a live listing
    /// of the best matching cached zone
    async fn resolve_record(&self, host: &str) -> Result<Option<Route53Record>, TraceError> {
        if let Some(records) = self.store.load::<Route53Record>(ResourceKind::Route53Records) {
            if let Some(found) = records.into_iter().find(|r| same_name(&r.name, host)) {
                return Ok(Some(found));
            }
        }

        let zones = self
            .store
            .load::<HostedZone>(ResourceKind::Route53Zones)
            .unwrap_or_default();
        let Some(zone) = best_zone(&zones, host) else {
            return Ok(None);
        };
        tracing::debug!("{} not cached, listing zone {}", host, zone.name);

        let mut token = None;
        loop {
            let page = self
                .cloud
                .list_record_sets(zone.bare_id(), token)
                .await
                .map_err(TraceError::Fetch)?;

            if let Some(mut found) = page.records.into_iter().find(|r| same_name(&r.name, host)) {
                found.zone_name = zone.name.clone();
                return Ok(Some(found));
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => return Ok(None),
            }
        }
    }

    /// Terminal hop for a host Route53 does not manage
    async fn external_dns(&self, host: &str) -> TraceNode {
        let node = TraceNode::new(NodeType::Dns, "External DNS");

        let ips = match self.resolver.lookup_ips(host).await {
            Ok(ips) => ips,
            Err(e) => {
                return node
                    .with_value(format!("Not in Route53. Lookup failed: {:#}", e))
                    .with_status(HopStatus::Unhealthy);
            }
        };

        let mut answer = ips
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        match self.resolver.lookup_cname(host).await {
            Ok(Some(cname)) if !same_name(&cname, host) => {
                answer = format!("{} -> {}", cname, answer);
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("CNAME lookup for {} failed: {:#}", host, e),
        }

        node.with_value(format!("Not in Route53. Dig results: {}", answer))
    }

    /// First cached distribution serving `target`, with the origin for `path`
    fn match_distribution(&self, target: &str, path: &str) -> Option<TraceNode> {
        let distributions = self
            .store
            .load::<Distribution>(ResourceKind::CloudFront)
            .unwrap_or_default();
        let target_lower = target.to_ascii_lowercase();

        let dist = distributions.into_iter().find(|d| {
            same_name(&d.domain, target)
                || d.aliases
                    .iter()
                    .any(|a| glob::matches(&target_lower, &a.to_ascii_lowercase()))
        })?;

        let (origin, via) = match dist
            .behaviors
            .iter()
            .find(|b| glob::matches(path, &b.path_pattern))
        {
            Some(b) => (
                dist.origins
                    .get(&b.target_origin_id)
                    .cloned()
                    .unwrap_or_else(|| b.target_origin_id.clone()),
                b.path_pattern.clone(),
            ),
            None => (dist.default_origin.clone(), "Default (*)".to_string()),
        };

        let origin_hop =
            TraceNode::new(NodeType::Origin, format!("Origin (via {})", via)).with_value(origin);
        Some(
            TraceNode::new(NodeType::CloudFront, format!("Distribution ({})", dist.id))
                .with_id(dist.id.clone())
                .with_value(dist.domain.clone())
                .with_child(origin_hop),
        )
    }

    fn match_load_balancer(&self, target: &str) -> Option<LoadBalancer> {
        let target = target.strip_prefix("dualstack.").unwrap_or(target);
        self.store
            .load::<LoadBalancer>(ResourceKind::LoadBalancers)
            .unwrap_or_default()
            .into_iter()
            .find(|lb| same_name(&lb.dns_name, target))
    }

    fn instance_names(&self) -> InstanceNames {
        let instances = self
            .store
            .load::<Ec2Instance>(ResourceKind::Ec2)
            .unwrap_or_default();
        InstanceNames::from_instances(&instances)
    }

    async fn trace_load_balancer(&self, lb: &LoadBalancer, host: &str, path: &str) -> TraceNode {
        let node_type = match lb.kind {
            LoadBalancerKind::Classic => NodeType::Clb,
            LoadBalancerKind::Network => NodeType::Nlb,
            _ => NodeType::Alb,
        };
        let mut node = TraceNode::new(node_type, format!("{} ({})", lb.name, lb.scheme))
            .with_id(lb.arn.clone())
            .with_value(lb.dns_name.clone());
        let names = self.instance_names();

        node.children = match lb.kind {
            LoadBalancerKind::Classic => self.trace_classic(lb, &names).await,
            LoadBalancerKind::Network => self.trace_network(lb, &names).await,
            _ => self.trace_application(lb, host, path, &names).await,
        };
        node
    }

    async fn trace_classic(&self, lb: &LoadBalancer, names: &InstanceNames) -> Vec<TraceNode> {
        let details = match self.cloud.describe_classic_load_balancer(&lb.name).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Failed to describe load balancer {}: {:#}", lb.name, e);
                return Vec::new();
            }
        };

        details
            .listeners
            .iter()
            .map(|l| {
                let mut hop = TraceNode::new(NodeType::Listener, l.label());
                hop.children = details
                    .instances
                    .iter()
                    .map(|h| member_node(h, names, NodeType::Instance, INSTANCE_HEALTHY))
                    .collect();
                hop
            })
            .collect()
    }

    async fn listeners(&self, lb: &LoadBalancer) -> Vec<Listener> {
        match self.cloud.describe_listeners(&lb.arn).await {
            Ok(listeners) => listeners,
            Err(e) => {
                tracing::warn!("Failed to fetch listeners for {}: {:#}", lb.name, e);
                Vec::new()
            }
        }
    }

    async fn trace_network(&self, lb: &LoadBalancer, names: &InstanceNames) -> Vec<TraceNode> {
        let mut hops = Vec::new();
        for listener in self.listeners(lb).await {
            let mut hop = TraceNode::new(NodeType::Listener, listener.label()).with_id(listener.arn);
            for arn in listener
                .default_actions
                .iter()
                .flat_map(|a| &a.target_group_arns)
            {
                hop.children
                    .push(trace_target_group(self.cloud, arn, names).await);
            }
            hops.push(hop);
        }
        hops
    }

    async fn trace_application(
        &self,
        lb: &LoadBalancer,
        host: &str,
        path: &str,
        names: &InstanceNames,
    ) -> Vec<TraceNode> {
        let mut hops = Vec::new();
        for listener in self.listeners(lb).await {
            let mut hop =
                TraceNode::new(NodeType::Listener, listener.label()).with_id(listener.arn.clone());

            let mut rules = match self.cloud.describe_rules(&listener.arn).await {
                Ok(rules) => rules,
                Err(e) => {
                    tracing::warn!("Failed to fetch rules for {}: {:#}", listener.label(), e);
                    Vec::new()
                }
            };
            sort_rules(&mut rules);

            match evaluate(&rules, host, path) {
                Some(rule) => {
                    let mut rule_hop =
                        TraceNode::new(NodeType::Rule, rule_label(rule)).with_id(rule.arn.clone());
                    for arn in rule.actions.iter().flat_map(|a| &a.target_group_arns) {
                        rule_hop
                            .children
                            .push(trace_target_group(self.cloud, arn, names).await);
                    }
                    hop.children.push(rule_hop);
                }
                None => {
                    for arn in listener
                        .default_actions
                        .iter()
                        .flat_map(|a| &a.target_group_arns)
                    {
                        let mut tg = trace_target_group(self.cloud, arn, names).await;
                        tg.name = format!("[Default] {}", tg.name);
                        hop.children.push(tg);
                    }
                }
            }
            hops.push(hop);
        }
        hops
    }
}

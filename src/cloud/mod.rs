//! Cloud provider boundary
//!
//! Everything that talks to live infrastructure sits behind the traits in
//! this module:
//! - [`Fetcher`] - bulk listing of one resource kind, used by cache refresh
//! - [`CloudApi`] - on-demand lookups the domain trace needs
//! - [`DnsResolver`] - system DNS for hosts Route53 does not manage
//!
//! The bundled implementation drives the `aws` command line tool.

mod aws_cli;
mod dns;
mod registry;

pub use aws_cli::{
    AWS_PROGRAM, AwsCli, DistributionFetcher, Ec2Fetcher, HostedZoneFetcher, LambdaFetcher,
    LoadBalancerFetcher, RdsClusterFetcher, RdsInstanceFetcher, RecordFetcher, S3Fetcher,
    SqsFetcher, SsmFetcher, default_registry,
};
pub use dns::SystemResolver;
pub use registry::{ErasedFetcher, FetchRegistry, Fetcher};

use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;

use crate::models::{ClassicLoadBalancerDetails, Listener, RecordSetPage, Rule, TargetHealth};

/// Credential profile and region selection, threaded through to the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub profile: Option<String>,
    pub region: Option<String>,
}

/// Live lookups performed during a domain trace
///
/// These layers are cheap to fetch for one load balancer and rarely needed,
/// so they are never cached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// One page of a hosted zone's record sets
    async fn list_record_sets(
        &self,
        zone_id: &str,
        page_token: Option<String>,
    ) -> Result<RecordSetPage>;

    /// Listeners of an application or network load balancer
    async fn describe_listeners(&self, load_balancer_arn: &str) -> Result<Vec<Listener>>;

    /// Rules of one listener, in the order the API returned them
    async fn describe_rules(&self, listener_arn: &str) -> Result<Vec<Rule>>;

    /// Member health of a target group
    async fn describe_target_health(&self, target_group_arn: &str) -> Result<Vec<TargetHealth>>;

    /// Listeners and instance health of a classic load balancer
    async fn describe_classic_load_balancer(
        &self,
        name: &str,
    ) -> Result<ClassicLoadBalancerDetails>;
}

/// System DNS lookups for hosts outside Route53
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn lookup_ips(&self, host: &str) -> Result<Vec<IpAddr>>;

    /// Canonical name of `host`, if it is a CNAME
    async fn lookup_cname(&self, host: &str) -> Result<Option<String>>;
}

//! Cached record types
//!
//! One struct per cached resource kind. Snapshots are JSON arrays of these
//! records, written in the order the fetcher returned them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An EC2 instance (`ec2` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ec2Instance {
    pub instance_id: String,
    /// Value of the `Name` tag, empty if untagged
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub private_ip: String,
    #[serde(default)]
    pub public_ip: String,
    #[serde(default)]
    pub launch_time: String,
}

impl Ec2Instance {
    /// Friendly name: the Name tag, falling back to the instance id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.instance_id
        } else {
            &self.name
        }
    }
}

/// A CloudFront distribution (`cloudfront` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    /// The `*.cloudfront.net` domain
    pub domain: String,
    #[serde(default)]
    pub status: String,
    /// Alternate domain names (CNAMEs); may contain wildcards
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub last_updated: String,
    /// Origin id -> origin domain name
    #[serde(default)]
    pub origins: BTreeMap<String, String>,
    /// Origin domain used by the default cache behavior
    #[serde(default)]
    pub default_origin: String,
    /// Ordered cache behaviors; the first matching path pattern wins
    #[serde(default)]
    pub behaviors: Vec<CacheBehavior>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheBehavior {
    pub path_pattern: String,
    pub target_origin_id: String,
}

/// A Route53 hosted zone (`route53-zones` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Zone id, possibly prefixed with `/hostedzone/`
    pub id: String,
    /// Zone name, usually with a trailing dot
    pub name: String,
    /// "public" or "private"
    #[serde(default)]
    pub zone_type: String,
    #[serde(default)]
    pub record_count: i64,
}

impl HostedZone {
    /// Zone id without the `/hostedzone/` prefix
    pub fn bare_id(&self) -> &str {
        self.id.trim_start_matches("/hostedzone/")
    }
}

/// A Route53 record set (`route53-records` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route53Record {
    #[serde(default)]
    pub zone_name: String,
    pub name: String,
    /// Record type, prefixed with `Alias+` for alias records
    pub record_type: String,
    /// TTL in seconds, or `ALIAS`
    #[serde(default)]
    pub ttl: String,
    /// First resource record value, or the alias target DNS name
    #[serde(default)]
    pub value: String,
}

/// Load balancer flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalancerKind {
    #[default]
    Application,
    Network,
    Classic,
    #[serde(other)]
    Other,
}

/// A load balancer of any flavour (`elb` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub kind: LoadBalancerKind,
    pub name: String,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub created_at: String,
    pub dns_name: String,
    /// Empty for classic load balancers
    #[serde(default)]
    pub arn: String,
}

/// An S3 bucket (`s3` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub creation_date: String,
}

/// A Lambda function (`lambda` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LambdaFunction {
    pub name: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub memory_mb: i64,
    #[serde(default)]
    pub timeout_secs: i64,
}

/// An SQS queue (`sqs` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqsQueue {
    pub name: String,
    /// "Standard" or "FIFO"
    #[serde(default)]
    pub queue_type: String,
    #[serde(default)]
    pub url: String,
}

impl SqsQueue {
    /// Build a queue record from its URL; the name is the last path segment
    pub fn from_url(url: &str) -> Self {
        let name = url.rsplit('/').next().unwrap_or(url).to_string();
        let queue_type = if name.ends_with(".fifo") { "FIFO" } else { "Standard" };
        SqsQueue {
            name,
            queue_type: queue_type.to_string(),
            url: url.to_string(),
        }
    }
}

/// SSM parameter metadata (`ssm` kind); values are never cached
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SsmParameter {
    pub name: String,
    #[serde(default)]
    pub parameter_type: String,
    #[serde(default)]
    pub last_modified: String,
    /// Short principal name of the last modifier
    #[serde(default)]
    pub modified_by: String,
}

/// An RDS cluster (`rds-clusters` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RdsCluster {
    pub identifier: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub engine_version: String,
    #[serde(default)]
    pub multi_az: bool,
    #[serde(default)]
    pub publicly_accessible: bool,
    #[serde(default)]
    pub instance_count: usize,
    #[serde(default)]
    pub storage_type: String,
    #[serde(default)]
    pub created_at: String,
}

/// Role of an instance within its cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RdsRole {
    /// Cluster writers and standalone instances
    #[default]
    Writer,
    Reader,
}

/// An RDS instance (`rds-instances` kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RdsInstance {
    /// Owning cluster, `None` for standalone instances
    #[serde(default)]
    pub cluster: Option<String>,
    pub identifier: String,
    #[serde(default)]
    pub role: RdsRole,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub engine_version: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub instance_class: String,
    #[serde(default)]
    pub availability_zone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqs_queue_from_url() {
        let q = SqsQueue::from_url("https://sqs.us-east-1.amazonaws.com/123456789012/orders.fifo");
        assert_eq!(q.name, "orders.fifo");
        assert_eq!(q.queue_type, "FIFO");

        let q = SqsQueue::from_url("https://sqs.us-east-1.amazonaws.com/123456789012/events");
        assert_eq!(q.name, "events");
        assert_eq!(q.queue_type, "Standard");
    }

    #[test]
    fn test_standalone_rds_instance_defaults() {
        let inst: RdsInstance = serde_json::from_str(r#"{"identifier": "db-1"}"#).unwrap();
        assert_eq!(inst.cluster, None);
        assert_eq!(inst.role, RdsRole::Writer);
    }
}

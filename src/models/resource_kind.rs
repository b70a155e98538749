//! Cached resource kind definitions
//!
//! Every resource kind that is cached locally has one variant here. The
//! kind name doubles as the cache file stem and the key in the metadata
//! document, so these strings must stay stable across releases.

use std::fmt;
use std::str::FromStr;

/// Enumeration of all cached AWS resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Ec2,
    S3,
    Lambda,
    CloudFront,
    Route53Zones,
    Route53Records,
    Ssm,
    LoadBalancers,
    RdsClusters,
    RdsInstances,
    Sqs,
}

impl ResourceKind {
    /// Get the stable kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Ec2 => "ec2",
            ResourceKind::S3 => "s3",
            ResourceKind::Lambda => "lambda",
            ResourceKind::CloudFront => "cloudfront",
            ResourceKind::Route53Zones => "route53-zones",
            ResourceKind::Route53Records => "route53-records",
            ResourceKind::Ssm => "ssm",
            ResourceKind::LoadBalancers => "elb",
            ResourceKind::RdsClusters => "rds-clusters",
            ResourceKind::RdsInstances => "rds-instances",
            ResourceKind::Sqs => "sqs",
        }
    }

    /// Try to parse a string into a ResourceKind, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Get all cached resource kinds
    ///
    /// Order matters for status output only; refreshes of distinct kinds are
    /// never ordered relative to each other.
    pub fn all() -> &'static [Self] {
        &[
            ResourceKind::Ec2,
            ResourceKind::S3,
            ResourceKind::Lambda,
            ResourceKind::CloudFront,
            ResourceKind::Route53Zones,
            ResourceKind::Route53Records,
            ResourceKind::Ssm,
            ResourceKind::LoadBalancers,
            ResourceKind::RdsClusters,
            ResourceKind::RdsInstances,
            ResourceKind::Sqs,
        ]
    }

    /// Kinds whose snapshots the domain trace reads
    pub fn trace_inputs() -> &'static [Self] {
        &[
            ResourceKind::Route53Records,
            ResourceKind::Route53Zones,
            ResourceKind::CloudFront,
            ResourceKind::LoadBalancers,
            ResourceKind::Ec2,
        ]
    }

    /// Try to parse a command alias (case-insensitive) into a ResourceKind
    pub fn from_alias(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ec2" | "instances" | "instance" => Some(ResourceKind::Ec2),
            "cloudfront" | "cf" | "distributions" => Some(ResourceKind::CloudFront),
            "route53-zones" | "zones" | "hostedzones" => Some(ResourceKind::Route53Zones),
            "route53-records" | "records" | "dns" => Some(ResourceKind::Route53Records),
            "elb" | "lb" | "loadbalancers" | "alb" | "nlb" => Some(ResourceKind::LoadBalancers),
            "s3" | "buckets" => Some(ResourceKind::S3),
            "lambda" | "functions" => Some(ResourceKind::Lambda),
            "ssm" | "parameters" | "params" => Some(ResourceKind::Ssm),
            "rds-clusters" | "rds" | "clusters" => Some(ResourceKind::RdsClusters),
            "rds-instances" | "ins" | "db-instances" => Some(ResourceKind::RdsInstances),
            "sqs" | "queues" => Some(ResourceKind::Sqs),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl serde::Serialize for ResourceKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ec2" => Ok(ResourceKind::Ec2),
            "cloudfront" => Ok(ResourceKind::CloudFront),
            "route53-zones" => Ok(ResourceKind::Route53Zones),
            "route53-records" => Ok(ResourceKind::Route53Records),
            "elb" => Ok(ResourceKind::LoadBalancers),
            "s3" => Ok(ResourceKind::S3),
            "lambda" => Ok(ResourceKind::Lambda),
            "ssm" => Ok(ResourceKind::Ssm),
            "rds-clusters" => Ok(ResourceKind::RdsClusters),
            "rds-instances" => Ok(ResourceKind::RdsInstances),
            "sqs" => Ok(ResourceKind::Sqs),
            _ => Err(format!("Unknown resource kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_round_trips() {
        for kind in ResourceKind::all() {
            assert_eq!(ResourceKind::parse_optional(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert_eq!(ResourceKind::parse_optional("kinesis"), None);
        assert_eq!(ResourceKind::parse_optional("rds"), None);
        assert_eq!(ResourceKind::parse_optional("EC2"), None);
    }

    #[test]
    fn test_from_alias() {
        assert_eq!(ResourceKind::from_alias("EC2"), Some(ResourceKind::Ec2));
        assert_eq!(ResourceKind::from_alias("cf"), Some(ResourceKind::CloudFront));
        assert_eq!(
            ResourceKind::from_alias("records"),
            Some(ResourceKind::Route53Records)
        );
        assert_eq!(ResourceKind::from_alias("alb"), Some(ResourceKind::LoadBalancers));
        assert_eq!(ResourceKind::from_alias("RDS"), Some(ResourceKind::RdsClusters));
        assert_eq!(ResourceKind::from_alias("kinesis"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ResourceKind::LoadBalancers), "elb");
        let s: String = ResourceKind::Route53Zones.into();
        assert_eq!(s, "route53-zones");
    }
}

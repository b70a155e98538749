//! cloudpath model layer
//!
//! Structure:
//! - `resource_kind.rs` - The enumeration of cached kinds
//! - `records.rs` - Record types persisted in snapshots
//! - `elb.rs` - Live load balancer details fetched during a trace

pub mod elb;
pub mod records;
pub mod resource_kind;

pub use elb::{
    Action, ClassicLoadBalancerDetails, Condition, Listener, RecordSetPage, Rule, TargetHealth,
};
pub use records::{
    CacheBehavior, Distribution, Ec2Instance, HostedZone, LambdaFunction, LoadBalancer,
    LoadBalancerKind, RdsCluster, RdsInstance, RdsRole, Route53Record, S3Bucket, SqsQueue,
    SsmParameter,
};
pub use resource_kind::ResourceKind;

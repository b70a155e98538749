//! Target group and instance health hops

use std::collections::HashMap;

use super::models::{HopStatus, NodeType, TraceNode};
use crate::cloud::CloudApi;
use crate::models::{Ec2Instance, TargetHealth};

/// Healthy state reported by v2 target groups
pub const TARGET_HEALTHY: &str = "healthy";

/// Healthy state reported by classic load balancer instances
pub const INSTANCE_HEALTHY: &str = "InService";

/// Instance id -> friendly name, from the cached EC2 snapshot
#[derive(Debug, Clone, Default)]
pub struct InstanceNames(HashMap<String, String>);

impl InstanceNames {
    pub fn from_instances(instances: &[Ec2Instance]) -> Self {
        Self(
            instances
                .iter()
                .map(|i| (i.instance_id.clone(), i.display_name().to_string()))
                .collect(),
        )
    }

    /// Friendly name for an id, falling back to the id itself
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.0.get(id).map(String::as_str).unwrap_or(id)
    }
}

/// Short display name from a target group ARN
///
/// `arn:aws:elasticloadbalancing:<region>:<acct>:targetgroup/<name>/<id>`
pub fn target_group_name(arn: &str) -> String {
    arn.split(':')
        .nth(5)
        .and_then(|resource| resource.split('/').nth(1))
        .unwrap_or("Unknown")
        .to_string()
}

/// Member hop value: the state, plus the reason when one is given
pub fn member_value(health: &TargetHealth) -> String {
    if health.reason.is_empty() || health.reason == "N/A" {
        health.state.clone()
    } else {
        format!("{} ({})", health.state, health.reason)
    }
}

/// Hop for one target group or classic load balancer member
pub fn member_node(
    health: &TargetHealth,
    names: &InstanceNames,
    node_type: NodeType,
    healthy_state: &str,
) -> TraceNode {
    TraceNode::new(node_type, names.resolve(&health.target_id))
        .with_id(health.target_id.clone())
        .with_value(member_value(health))
        .with_status(HopStatus::from_healthy(health.state == healthy_state))
}

/// Build a target group hop from its members' health
pub fn aggregate(arn: &str, members: &[TargetHealth], names: &InstanceNames) -> TraceNode {
    let children: Vec<TraceNode> = members
        .iter()
        .map(|h| member_node(h, names, NodeType::Target, TARGET_HEALTHY))
        .collect();
    let any_healthy = children.iter().any(|c| c.status == HopStatus::Healthy);

    let mut node = TraceNode::new(NodeType::TargetGroup, target_group_name(arn))
        .with_id(arn)
        .with_status(HopStatus::from_healthy(any_healthy));
    node.children = children;
    node
}

/// Fetch member health live and aggregate it
///
/// A failed health lookup yields a group with no members, which reads as
/// unhealthy.
pub async fn trace_target_group(
    cloud: &dyn CloudApi,
    arn: &str,
    names: &InstanceNames,
) -> TraceNode {
    let members = match cloud.describe_target_health(arn).await {
        Ok(members) => members,
        Err(e) => {
            tracing::warn!("Failed to fetch target health for {}: {:#}", arn, e);
            Vec::new()
        }
    };
    aggregate(arn, &members, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MockCloudApi;

    const ARN: &str =
        "arn:aws:elasticloadbalancing:us-east-1:123456789012:targetgroup/web-tg/6d0ecf831eec9f09";

    fn health(id: &str, state: &str, reason: &str) -> TargetHealth {
        TargetHealth {
            target_id: id.to_string(),
            state: state.to_string(),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_target_group_name() {
        assert_eq!(target_group_name(ARN), "web-tg");
        assert_eq!(target_group_name("not-an-arn"), "Unknown");
        assert_eq!(
            target_group_name("arn:aws:elasticloadbalancing:r:a:targetgroup"),
            "Unknown"
        );
    }

    #[test]
    fn test_member_value_reason() {
        assert_eq!(member_value(&health("i-1", "healthy", "")), "healthy");
        assert_eq!(member_value(&health("i-1", "healthy", "N/A")), "healthy");
        assert_eq!(
            member_value(&health("i-1", "unhealthy", "Target.Timeout")),
            "unhealthy (Target.Timeout)"
        );
    }

    #[test]
    fn test_one_healthy_member_makes_group_healthy() {
        let names = InstanceNames::from_instances(&[Ec2Instance {
            instance_id: "i-1".to_string(),
            name: "web-1".to_string(),
            ..Default::default()
        }]);
        let members = vec![
            health("i-1", "healthy", ""),
            health("i-2", "unhealthy", "Target.Timeout"),
        ];

        let node = aggregate(ARN, &members, &names);
        assert_eq!(node.name, "web-tg");
        assert_eq!(node.status, HopStatus::Healthy);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].name, "web-1");
        assert_eq!(node.children[0].status, HopStatus::Healthy);
        assert_eq!(node.children[1].name, "i-2");
        assert_eq!(node.children[1].value, "unhealthy (Target.Timeout)");
        assert_eq!(node.children[1].status, HopStatus::Unhealthy);
    }

    #[test]
    fn test_no_healthy_member_makes_group_unhealthy() {
        let node = aggregate(
            ARN,
            &[health("i-1", "draining", "")],
            &InstanceNames::default(),
        );
        assert_eq!(node.status, HopStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_fetch_failure_degrades() {
        let mut cloud = MockCloudApi::new();
        cloud
            .expect_describe_target_health()
            .returning(|_| Err(anyhow::anyhow!("AccessDenied")));

        let node = trace_target_group(&cloud, ARN, &InstanceNames::default()).await;
        assert!(node.children.is_empty());
        assert_eq!(node.status, HopStatus::Unhealthy);
    }
}

//! Live load balancer details
//!
//! These are fetched on demand during a trace and never cached.

use serde::{Deserialize, Serialize};

use super::Route53Record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    #[serde(default)]
    pub arn: String,
    pub protocol: String,
    pub port: i32,
    #[serde(default)]
    pub default_actions: Vec<Action>,
}

impl Listener {
    pub fn label(&self) -> String {
        format!("{}:{}", self.protocol, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub arn: String,
    /// Numeric priority as a string, or "default"
    pub priority: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// "host-header", "path-pattern", ...
    pub field: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: String,
    /// Target groups this action forwards to; weighted forwards list several
    #[serde(default)]
    pub target_group_arns: Vec<String>,
}

impl Action {
    pub fn forward(target_group_arn: impl Into<String>) -> Self {
        Self {
            action_type: "forward".to_string(),
            target_group_arns: vec![target_group_arn.into()],
        }
    }
}

/// Health of one member of a target group, or one classic ELB instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetHealth {
    pub target_id: String,
    pub state: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassicLoadBalancerDetails {
    pub listeners: Vec<Listener>,
    pub instances: Vec<TargetHealth>,
}

/// One page of a hosted zone's record sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSetPage {
    pub records: Vec<Route53Record>,
    /// Token for the next page; None when this was the last page
    pub next_token: Option<String>,
}

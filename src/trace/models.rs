//! Data structures for trace results

use serde::Serialize;
use std::fmt;

/// Layer a hop belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeType {
    #[serde(rename = "DNS")]
    Dns,
    Route53,
    CloudFront,
    Origin,
    #[serde(rename = "ALB")]
    Alb,
    #[serde(rename = "NLB")]
    Nlb,
    #[serde(rename = "CLB")]
    Clb,
    TargetGroup,
    Listener,
    Rule,
    Instance,
    Target,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Dns => "DNS",
            NodeType::Route53 => "Route53",
            NodeType::CloudFront => "CloudFront",
            NodeType::Origin => "Origin",
            NodeType::Alb => "ALB",
            NodeType::Nlb => "NLB",
            NodeType::Clb => "CLB",
            NodeType::TargetGroup => "TargetGroup",
            NodeType::Listener => "Listener",
            NodeType::Rule => "Rule",
            NodeType::Instance => "Instance",
            NodeType::Target => "Target",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health verdict of a hop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HopStatus {
    Healthy,
    Unhealthy,
    /// No health signal applies to this layer
    #[default]
    Neutral,
}

impl HopStatus {
    pub fn from_healthy(healthy: bool) -> Self {
        if healthy {
            HopStatus::Healthy
        } else {
            HopStatus::Unhealthy
        }
    }
}

/// One hop of the resolved request path
///
/// Each node owns its children; the tree is built once per trace and not
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    pub status: HopStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TraceNode>,
}

impl TraceNode {
    pub fn new(node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            node_type,
            name: name.into(),
            id: String::new(),
            value: String::new(),
            status: HopStatus::Neutral,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_status(mut self, status: HopStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_child(mut self, child: TraceNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search for the first node of a type
    pub fn find(&self, node_type: NodeType) -> Option<&TraceNode> {
        if self.node_type == node_type {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(node_type))
    }
}

/// Trace result for one input domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceResult {
    /// The input exactly as given
    pub domain: String,
    pub hops: Vec<TraceNode>,
}

impl TraceResult {
    /// First node of a type anywhere in the tree
    pub fn find(&self, node_type: NodeType) -> Option<&TraceNode> {
        self.hops.iter().find_map(|h| h.find(node_type))
    }
}

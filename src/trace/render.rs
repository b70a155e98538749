//! Text and JSON output for trace results

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::models::{HopStatus, TraceNode, TraceResult};

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Tree,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" => Ok(OutputFormat::Tree),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format '{}' (expected tree or json)", s)),
        }
    }
}

fn status_marker(status: HopStatus, icons: bool) -> &'static str {
    match (status, icons) {
        (HopStatus::Healthy, true) => "✓ ",
        (HopStatus::Unhealthy, true) => "✗ ",
        (HopStatus::Healthy, false) => "[OK] ",
        (HopStatus::Unhealthy, false) => "[ERR] ",
        (HopStatus::Neutral, _) => "",
    }
}

fn node_label(node: &TraceNode, icons: bool) -> String {
    let mut label = format!(
        "{}[{}] {}",
        status_marker(node.status, icons),
        node.node_type,
        node.name.trim_end()
    );
    if !node.value.is_empty() {
        label.push_str(" -> ");
        label.push_str(&node.value);
    }
    label
}

fn push_node(lines: &mut Vec<String>, node: &TraceNode, prefix: &str, last: bool, icons: bool) {
    let branch = if last { "└── " } else { "├── " };
    lines.push(format!("{}{}{}", prefix, branch, node_label(node, icons)));

    let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
    for (i, child) in node.children.iter().enumerate() {
        push_node(
            lines,
            child,
            &child_prefix,
            i + 1 == node.children.len(),
            icons,
        );
    }
}

/// Render the hop tree, one line per hop, without a trailing newline
///
/// With `icons` off, health is shown as `[OK]`/`[ERR]` for terminals
/// without Unicode symbols.
pub fn render_tree(result: &TraceResult, icons: bool) -> String {
    let mut lines = vec![result.domain.clone()];
    for (i, hop) in result.hops.iter().enumerate() {
        push_node(&mut lines, hop, "", i + 1 == result.hops.len(), icons);
    }
    lines.join("\n")
}

pub fn render_json(result: &TraceResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize trace result")
}

pub fn render(result: &TraceResult, format: OutputFormat, icons: bool) -> Result<String> {
    match format {
        OutputFormat::Tree => Ok(render_tree(result, icons)),
        OutputFormat::Json => render_json(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::models::NodeType;

    fn cloudfront_result() -> TraceResult {
        let origin = TraceNode::new(NodeType::Origin, "Origin (via Default (*))")
            .with_value("web.s3.amazonaws.com");
        let dist = TraceNode::new(NodeType::CloudFront, "Distribution (E1)")
            .with_id("E1")
            .with_value("d111.cloudfront.net")
            .with_child(origin);
        let record = TraceNode::new(NodeType::Route53, "www.example.com.")
            .with_value("d111.cloudfront.net. (Alias+A)")
            .with_child(dist);
        TraceResult {
            domain: "www.example.com".to_string(),
            hops: vec![record],
        }
    }

    #[test]
    fn test_render_cloudfront_tree() {
        insta::assert_snapshot!(render_tree(&cloudfront_result(), true), @r"
        www.example.com
        └── [Route53] www.example.com. -> d111.cloudfront.net. (Alias+A)
            └── [CloudFront] Distribution (E1) -> d111.cloudfront.net
                └── [Origin] Origin (via Default (*)) -> web.s3.amazonaws.com
        ");
    }

    #[test]
    fn test_render_health_without_icons() {
        let group = TraceNode::new(NodeType::TargetGroup, "web-tg")
            .with_status(HopStatus::Healthy)
            .with_child(
                TraceNode::new(NodeType::Target, "web-1")
                    .with_value("healthy")
                    .with_status(HopStatus::Healthy),
            )
            .with_child(
                TraceNode::new(NodeType::Target, "i-2")
                    .with_value("unhealthy (Target.Timeout)")
                    .with_status(HopStatus::Unhealthy),
            );
        let listener = TraceNode::new(NodeType::Listener, "HTTPS:443").with_child(group);
        let result = TraceResult {
            domain: "api.example.com".to_string(),
            hops: vec![listener],
        };

        insta::assert_snapshot!(render_tree(&result, false), @r"
        api.example.com
        └── [Listener] HTTPS:443
            └── [OK] [TargetGroup] web-tg
                ├── [OK] [Target] web-1 -> healthy
                └── [ERR] [Target] i-2 -> unhealthy (Target.Timeout)
        ");
    }

    #[test]
    fn test_render_json_shape() {
        let json = render_json(&cloudfront_result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let record = &value["hops"][0];
        assert_eq!(record["type"], "Route53");
        assert_eq!(record["status"], "neutral");
        assert!(record.get("id").is_none());
        assert_eq!(record["children"][0]["type"], "CloudFront");
        assert_eq!(record["children"][0]["id"], "E1");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}

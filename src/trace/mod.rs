//! Domain trace functionality
//!
//! Follows a request for a domain (optionally a full URL) through Route53,
//! CloudFront and the load balancer layers down to individual targets, and
//! explains each step as a hop in a tree.

mod core;
pub mod glob;
mod models;
pub mod render;
pub mod rules;
pub mod target_group;

use std::time::Duration;

pub use core::{TRACE_TIMEOUT, TraceEngine, normalize};
pub use models::{HopStatus, NodeType, TraceNode, TraceResult};
pub use render::{OutputFormat, render, render_json, render_tree};

/// Ways a trace can fail without producing a result
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Live record lookup failed while resolving the domain
    #[error("Record lookup failed: {0:#}")]
    Fetch(anyhow::Error),

    #[error("Trace timed out after {0:?}")]
    Timeout(Duration),

    #[error("Trace canceled")]
    Canceled,
}

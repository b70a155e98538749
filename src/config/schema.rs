//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults;
use crate::cloud::Credentials;
use crate::trace::OutputFormat;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Snapshot time-to-live, e.g. "30m", "24h", "7d"
    #[serde(default = "default_ttl")]
    pub ttl: String,

    /// Refresh stale snapshots in the background while commands run
    #[serde(default = "default_true")]
    pub auto_refresh: bool,

    /// Skip hosted zones with more record sets than this; 0 means no limit
    #[serde(default = "default_route53_max_records")]
    pub route53_max_records: i64,

    /// Cache directory; the platform cache dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// AWS access configuration
    #[serde(default)]
    pub aws: AwsConfig,

    /// Output configuration
    #[serde(default)]
    pub ui: UiConfig,
}

/// AWS access configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    /// Named credentials profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// `aws` executable to run
    #[serde(default = "default_program")]
    pub program: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    #[serde(default)]
    pub output: OutputFormat,

    /// Disable Unicode icons for compatibility
    #[serde(default = "default_false")]
    pub no_icons: bool,
}

// Default value functions
fn default_ttl() -> String {
    defaults::DEFAULT_TTL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_route53_max_records() -> i64 {
    defaults::default_route53_max_records()
}

fn default_program() -> String {
    crate::cloud::AWS_PROGRAM.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            auto_refresh: default_true(),
            route53_max_records: default_route53_max_records(),
            cache_dir: None,
            aws: AwsConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            profile: None,
            region: None,
            program: default_program(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            no_icons: default_false(),
        }
    }
}

impl Config {
    /// Parsed TTL
    pub fn ttl_duration(&self) -> Result<Duration> {
        super::parse_duration(&self.ttl)
    }

    /// Cache directory in effect
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(super::paths::default_cache_dir)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            profile: self.aws.profile.clone(),
            region: self.aws.region.clone(),
        }
    }
}

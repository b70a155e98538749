//! Configuration system for cloudpath
//!
//! A single YAML file in the config directory, layered under environment
//! variables and command line flags.

pub mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::{ConfigLoader, ConfigOverrides};
pub use schema::{AwsConfig, Config, UiConfig};

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

/// Every key accepted by `config get` and `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "ttl",
    "autoRefresh",
    "route53MaxRecords",
    "cacheDir",
    "aws.profile",
    "aws.region",
    "aws.program",
    "ui.output",
    "ui.noIcons",
];

/// Parse a duration like `500ms`, `30s`, `15m`, `24h` or `7d`
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let ms: u64 = ms.parse().context("Invalid milliseconds in duration")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(secs) = s.strip_suffix('s') {
        let secs: u64 = secs.parse().context("Invalid seconds in duration")?;
        Ok(Duration::from_secs(secs))
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins: u64 = mins.parse().context("Invalid minutes in duration")?;
        Ok(Duration::from_secs(mins * 60))
    } else if let Some(hours) = s.strip_suffix('h') {
        let hours: u64 = hours.parse().context("Invalid hours in duration")?;
        Ok(Duration::from_secs(hours * 3600))
    } else if let Some(days) = s.strip_suffix('d') {
        let days: u64 = days.parse().context("Invalid days in duration")?;
        Ok(Duration::from_secs(days * 86400))
    } else {
        anyhow::bail!("Invalid duration format: {}", s)
    }
}

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &schema::Config, key: &str) -> anyhow::Result<String> {
    match key {
        "ttl" => Ok(config.ttl.clone()),
        "autoRefresh" => Ok(config.auto_refresh.to_string()),
        "route53MaxRecords" => Ok(config.route53_max_records.to_string()),
        "cacheDir" => Ok(config.resolved_cache_dir().display().to_string()),
        "aws.profile" => Ok(config.aws.profile.clone().unwrap_or_default()),
        "aws.region" => Ok(config.aws.region.clone().unwrap_or_default()),
        "aws.program" => Ok(config.aws.program.clone()),
        "ui.output" => Ok(match config.ui.output {
            crate::trace::OutputFormat::Tree => "tree".to_string(),
            crate::trace::OutputFormat::Json => "json".to_string(),
        }),
        "ui.noIcons" => Ok(config.ui.no_icons.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
///
/// An empty value clears optional keys.
pub fn set_config_value(config: &mut schema::Config, key: &str, value: &str) -> anyhow::Result<()> {
    let optional = |value: &str| (!value.is_empty()).then(|| value.to_string());

    match key {
        "ttl" => {
            parse_duration(value).context("ttl must be a duration like 30m, 24h or 7d")?;
            config.ttl = value.to_string();
        }
        "autoRefresh" => {
            config.auto_refresh = value
                .parse()
                .context("autoRefresh must be 'true' or 'false'")?;
        }
        "route53MaxRecords" => {
            config.route53_max_records = value
                .parse()
                .context("route53MaxRecords must be a number")?;
        }
        "cacheDir" => {
            config.cache_dir = optional(value).map(PathBuf::from);
        }
        "aws.profile" => {
            config.aws.profile = optional(value);
        }
        "aws.region" => {
            config.aws.region = optional(value);
        }
        "aws.program" => {
            config.aws.program =
                optional(value).unwrap_or_else(|| crate::cloud::AWS_PROGRAM.to_string());
        }
        "ui.output" => {
            config.ui.output = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        "ui.noIcons" => {
            config.ui.no_icons = value
                .parse()
                .context("ui.noIcons must be 'true' or 'false'")?;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

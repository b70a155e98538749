//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, parse_duration, paths, schema::Config};
use crate::trace::OutputFormat;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Values given on the command line; `None` leaves the setting alone
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub ttl: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub no_auto_refresh: bool,
    pub output: Option<OutputFormat>,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Command line flags
    /// 2. Environment variable overrides
    /// 3. Root config file
    /// 4. Built-in defaults
    pub fn load(overrides: &ConfigOverrides) -> Result<Config> {
        let mut config = Self::load_defaults();

        let root_path = paths::root_config_path();
        if root_path.exists() {
            config = Self::load_file(&root_path)?;
        }

        config = Self::apply_env_overrides(config);
        config = Self::apply_overrides(config, overrides);

        // Surface a bad TTL before any command relies on it
        config
            .ttl_duration()
            .with_context(|| format!("Invalid ttl '{}'", config.ttl))?;

        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// Keys missing from the file take their defaults.
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(config: Config) -> Config {
        Self::apply_env_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    fn apply_env_from(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
        if let Some(profile) = lookup("CLOUDPATH_PROFILE") {
            config.aws.profile = Some(profile);
        }

        if let Some(region) = lookup("CLOUDPATH_REGION") {
            config.aws.region = Some(region);
        }

        if let Some(ttl) = lookup("CLOUDPATH_TTL") {
            if parse_duration(&ttl).is_ok() {
                config.ttl = ttl;
            } else {
                tracing::warn!("Ignoring invalid CLOUDPATH_TTL '{}'", ttl);
            }
        }

        if let Some(dir) = lookup("CLOUDPATH_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Apply command line overrides
    pub fn apply_overrides(mut config: Config, overrides: &ConfigOverrides) -> Config {
        if let Some(profile) = &overrides.profile {
            config.aws.profile = Some(profile.clone());
        }
        if let Some(region) = &overrides.region {
            config.aws.region = Some(region.clone());
        }
        if let Some(ttl) = &overrides.ttl {
            config.ttl = ttl.clone();
        }
        if let Some(dir) = &overrides.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if overrides.no_auto_refresh {
            config.auto_refresh = false;
        }
        if let Some(output) = overrides.output {
            config.ui.output = output;
        }
        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.ttl, "24h");
        assert!(config.auto_refresh);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CLOUDPATH_PROFILE", "prod"),
            ("CLOUDPATH_TTL", "15m"),
            ("CLOUDPATH_CACHE_DIR", "/tmp/cp"),
        ]
        .into_iter()
        .collect();

        let config = ConfigLoader::apply_env_from(Config::default(), |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.aws.profile.as_deref(), Some("prod"));
        assert_eq!(config.aws.region, None);
        assert_eq!(config.ttl, "15m");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cp")));
    }

    #[test]
    fn test_invalid_env_ttl_is_ignored() {
        let config = ConfigLoader::apply_env_from(Config::default(), |key| {
            (key == "CLOUDPATH_TTL").then(|| "soon".to_string())
        });
        assert_eq!(config.ttl, "24h");
    }

    #[test]
    fn test_flags_beat_env() {
        let config = ConfigLoader::apply_env_from(Config::default(), |key| {
            (key == "CLOUDPATH_PROFILE").then(|| "from-env".to_string())
        });
        let overrides = ConfigOverrides {
            profile: Some("from-flag".to_string()),
            no_auto_refresh: true,
            output: Some(OutputFormat::Json),
            ..Default::default()
        };
        let config = ConfigLoader::apply_overrides(config, &overrides);

        assert_eq!(config.aws.profile.as_deref(), Some("from-flag"));
        assert!(!config.auto_refresh);
        assert_eq!(config.ui.output, OutputFormat::Json);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.route53_max_records = 50;
        config.aws.region = Some("us-west-2".to_string());

        ConfigLoader::save(&config, &path).unwrap();
        let loaded = ConfigLoader::load_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "autoRefresh: false\n").unwrap();

        let config = ConfigLoader::load_file(&path).unwrap();
        assert!(!config.auto_refresh);
        assert_eq!(config.ttl, "24h");
        assert_eq!(config.route53_max_records, 1000);
    }
}

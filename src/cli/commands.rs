//! Config command handlers

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::{self, ConfigLoader, ConfigOverrides, paths};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "ttl", "aws.profile")
        key: Option<String>,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "ttl", "aws.profile")
        key: String,
        /// Configuration value; empty clears optional keys
        value: String,
    },
    /// List all configuration
    List,
    /// List every configuration key
    Keys,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

/// Handle configuration subcommands
pub fn handle_config_command(cmd: ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load(&ConfigOverrides::default())
                .context("Failed to load configuration")?;

            if let Some(key) = key {
                println!("{}", config::get_config_value(&config, &key)?);
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Set { key, value } => {
            // Only the file layer is saved, not env overrides
            let path = paths::root_config_path();
            let mut config = if path.exists() {
                ConfigLoader::load_file(&path)?
            } else {
                ConfigLoader::load_defaults()
            };

            config::set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {} = {}", key, value))?;

            ConfigLoader::save_root(&config).context("Failed to save configuration")?;
            println!("Configuration saved");
        }
        ConfigSubcommand::List => {
            let config = ConfigLoader::load(&ConfigOverrides::default())
                .context("Failed to load configuration")?;
            for key in config::CONFIG_KEYS {
                println!("{} = {}", key, config::get_config_value(&config, key)?);
            }
        }
        ConfigSubcommand::Keys => {
            for key in config::CONFIG_KEYS {
                println!("{}", key);
            }
        }
        ConfigSubcommand::Path => {
            println!("{}", paths::root_config_path().display());
        }
        ConfigSubcommand::Validate => match ConfigLoader::load(&ConfigOverrides::default()) {
            Ok(_) => println!("Configuration is valid"),
            Err(e) => anyhow::bail!("Configuration validation failed: {:#}", e),
        },
    }

    Ok(())
}

//! cloudpath - trace how a request for a domain travels through AWS
//!
//! Route53, CloudFront, load balancer and other service inventories are
//! cached locally and refreshed in the background once stale; listener, rule
//! and health details are looked up live during a trace.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use cloudpath::cli::{self, ConfigSubcommand, Session};
use cloudpath::config::{ConfigLoader, ConfigOverrides};
use cloudpath::trace::OutputFormat;

/// cloudpath - trace how a request for a domain travels through AWS
#[derive(Parser, Debug)]
#[command(name = "cloudpath")]
#[command(about = "Trace how a request for a domain flows through your AWS infrastructure", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// AWS CLI profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Refresh cached data before running the command
    #[arg(long, global = true)]
    refresh: bool,

    /// Cache TTL (e.g., 30m, 24h)
    #[arg(long, global = true)]
    ttl: Option<String>,

    /// Never refresh stale data in the background
    #[arg(long, global = true)]
    no_auto_refresh: bool,

    /// Cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Plain status markers instead of icons
    #[arg(long, global = true)]
    no_icons: bool,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Trace a domain or URL through DNS, CloudFront and load balancers
    Trace {
        /// Domain or URL, e.g. api.example.com or https://example.com/api/v1
        domain: String,
    },
    /// Refresh cached resources (all kinds when none are given)
    Refresh {
        /// Kinds or aliases: ec2, s3, lambda, cloudfront, zones, records, ssm, elb,
        /// rds-clusters, rds-instances, sqs
        kinds: Vec<String>,
    },
    /// Show cache freshness for every kind
    Status,
    /// List cached resources of one kind
    List {
        /// Kind or alias: ec2, s3, lambda, cloudfront, zones, records, ssm, elb,
        /// rds-clusters, rds-instances, sqs
        kind: String,
    },
    /// SSM Parameter Store lookups
    Ssm {
        #[command(subcommand)]
        subcommand: SsmSubcommand,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
enum SsmSubcommand {
    /// Print the decrypted value of a parameter
    Get {
        /// Parameter name, e.g. /app/db/password
        name: String,
    },
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            profile: self.profile.clone(),
            region: self.region.clone(),
            ttl: self.ttl.clone(),
            cache_dir: self.cache_dir.clone(),
            no_auto_refresh: self.no_auto_refresh,
            output: self.output,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    let overrides = args.overrides();
    match args.command {
        Command::Config { subcommand } => cli::handle_config_command(subcommand),
        Command::Version => {
            cli::display_version();
            Ok(())
        }
        command => run(command, &overrides, args.refresh, args.no_icons).await,
    }
}

/// Run a command that works against the cache
async fn run(
    command: Command,
    overrides: &ConfigOverrides,
    force_refresh: bool,
    no_icons: bool,
) -> Result<()> {
    let mut config = ConfigLoader::load(overrides).context("Failed to load configuration")?;
    if no_icons {
        config.ui.no_icons = true;
    }
    tracing::debug!(
        "Configuration loaded: ttl={}, autoRefresh={}, profile={:?}, region={:?}",
        config.ttl,
        config.auto_refresh,
        config.aws.profile,
        config.aws.region
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received, canceling");
            on_interrupt.cancel();
        }
    });

    let session = Session::new(config, cancel, force_refresh)?;
    match command {
        Command::Trace { domain } => session.trace(&domain).await,
        Command::Refresh { kinds } => session.refresh(&kinds).await,
        Command::Status => session.status(),
        Command::List { kind } => session.list(&kind).await,
        Command::Ssm {
            subcommand: SsmSubcommand::Get { name },
        } => session.ssm_get(&name).await,
        Command::Config { .. } | Command::Version => Ok(()),
    }
}

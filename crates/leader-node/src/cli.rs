//! Command-line interface
//!
//! Flags override the configuration file, which overrides built-in defaults.

use crate::config::{NodeConfig, StoreKind};
use clap::{Args, Parser, Subcommand, ValueEnum};
use leader_election::ConfigError;
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Singleton coordination node for scaled-out job services
#[derive(Debug, Parser)]
#[command(name = "leader-node", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Record store backend
    #[arg(long, global = true, value_enum)]
    pub store: Option<StoreKind>,

    /// Connection string for the postgres store
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Shared management record id
    #[arg(long, global = true)]
    pub management_id: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join the election and run until interrupted
    Run(RunArgs),
    /// Print the shared management record as JSON (postgres store only)
    Status,
}

/// Timing and channel overrides for `run`
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Inbound consumer channel to gate, repeatable
    #[arg(long = "channel")]
    pub channels: Vec<String>,

    /// Seconds between heartbeats while master
    #[arg(long)]
    pub heartbeat_interval: Option<u64>,

    /// Seconds between lease probes while candidate
    #[arg(long)]
    pub check_interval: Option<u64>,

    /// Seconds after which an unrefreshed lease can be taken over
    #[arg(long)]
    pub expiration: Option<u64>,
}

impl Cli {
    /// Load the configuration file (if any), apply flag overrides and validate.
    ///
    /// # Errors
    /// Unreadable or invalid configuration.
    pub fn resolve(&self) -> Result<NodeConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_file(path)?,
            None => NodeConfig::default(),
        };

        if let Some(store) = self.store {
            config.node.store = store;
        }
        if let Some(url) = &self.database_url {
            config.node.database_url = Some(url.clone());
        }
        if let Some(id) = &self.management_id {
            config.management.management_id = id.clone();
        }

        match &self.command {
            Command::Run(run) => run.apply(&mut config),
            // A fresh in-memory store never holds anyone else's record
            Command::Status if config.node.store == StoreKind::Memory => {
                return Err(ConfigError::invalid(
                    "store",
                    "status reads the shared record; use --store postgres",
                ));
            }
            Command::Status => {}
        }

        config.validate()?;
        Ok(config)
    }
}

impl RunArgs {
    fn apply(&self, config: &mut NodeConfig) {
        if !self.channels.is_empty() {
            config.node.channels.clone_from(&self.channels);
        }
        if let Some(secs) = self.heartbeat_interval {
            config.management.heartbeat_interval_secs = secs;
        }
        if let Some(secs) = self.check_interval {
            config.management.master_check_interval_secs = secs;
        }
        if let Some(secs) = self.expiration {
            config.management.heartbeat_expiration_secs = secs;
        }
    }
}

//! Node configuration
//!
//! One TOML file carries both the election settings and the node wiring:
//!
//! ```toml
//! [management]
//! heartbeat_expiration_secs = 10
//!
//! [node]
//! store = "postgres"
//! database_url = "postgres://jobs@localhost/jobs"
//! channels = ["job-request-events"]
//! ```

use clap::ValueEnum;
use leader_election::{ConfigError, ElectionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Record store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local store, single instance only
    #[default]
    Memory,
    /// Shared PostgreSQL table
    Postgres,
}

/// Node wiring
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Store backend
    pub store: StoreKind,
    /// Connection string for the postgres store
    pub database_url: Option<String>,
    /// Inbound consumer channels gated by the election
    pub channels: Vec<String>,
}

/// Full node configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Election settings
    pub management: ElectionConfig,
    /// Node wiring
    pub node: NodeSection,
}

impl NodeConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    /// Parse failures.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// I/O or parse failures.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Check election settings and store wiring
    ///
    /// # Errors
    /// The first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.management.validate()?;
        if self.node.store == StoreKind::Postgres && self.node.database_url.is_none() {
            return Err(ConfigError::invalid(
                "database_url",
                "required for the postgres store",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_memory_defaults() {
        let config = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.node.store, StoreKind::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_node_section() {
        let config = NodeConfig::from_toml_str(
            r#"
            [management]
            management_id = "scheduler"

            [node]
            store = "postgres"
            database_url = "postgres://localhost/jobs"
            channels = ["requests", "events"]
            "#,
        )
        .unwrap();

        assert_eq!(config.management.management_id, "scheduler");
        assert_eq!(config.node.store, StoreKind::Postgres);
        assert_eq!(config.node.channels, vec!["requests", "events"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn postgres_requires_url() {
        let config = NodeConfig::from_toml_str("[node]\nstore = \"postgres\"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "database_url",
                ..
            })
        ));
    }
}

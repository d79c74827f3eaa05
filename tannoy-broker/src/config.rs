//! Broker configuration types.

use serde::{Deserialize, Serialize};
use tannoy_core::{Error, Result};

/// Role-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoleConfig {
    /// Primary broker; replicates accepted publishes to the backup, if one
    /// is configured.
    Primary {
        /// Backup broker address (`host:port`). With `None` the broker runs
        /// standalone and publishes are acknowledged without replication.
        backup_addr: Option<String>,
    },
    /// Hot-standby backup; probes the primary and takes over on loss.
    Backup {
        /// Primary broker address (`host:port`) to probe.
        primary_addr: String,
    },
}

/// Configuration for one broker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Address to bind the client listener to (`host:port`).
    pub bind_addr: String,

    /// Broker role and peer address.
    pub role: RoleConfig,
}

impl BrokerConfig {
    /// Create a primary configuration.
    #[must_use]
    pub fn primary(bind_addr: impl Into<String>, backup_addr: Option<String>) -> Self {
        Self { bind_addr: bind_addr.into(), role: RoleConfig::Primary { backup_addr } }
    }

    /// Create a backup configuration.
    #[must_use]
    pub fn backup(bind_addr: impl Into<String>, primary_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            role: RoleConfig::Backup { primary_addr: primary_addr.into() },
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if the bind address or a required peer address is
    /// empty.
    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.is_empty() {
            return Err(Error::configuration("bind address must not be empty"));
        }
        match &self.role {
            RoleConfig::Primary { backup_addr: Some(addr) } | RoleConfig::Backup { primary_addr: addr }
                if addr.is_empty() =>
            {
                Err(Error::configuration("peer address must not be empty"))
            },
            _ => Ok(()),
        }
    }

    /// Human-readable role name for logging.
    #[must_use]
    pub const fn role_name(&self) -> &'static str {
        match self.role {
            RoleConfig::Primary { .. } => "primary",
            RoleConfig::Backup { .. } => "backup",
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::primary("127.0.0.1:8080", None)
    }
}

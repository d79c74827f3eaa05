//! Publisher configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tannoy_core::{Error, Result};

/// Configuration for a failover publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Primary broker address (`host:port`).
    pub primary_addr: String,

    /// Backup broker address (`host:port`).
    pub backup_addr: String,

    /// How long to wait for the primary's `ACK` before failing over.
    pub ack_timeout: Duration,

    /// Number of recent messages kept for replay to the backup.
    pub window_size: usize,

    /// Pacing gap between window replay sends.
    pub replay_gap: Duration,
}

impl PublisherConfig {
    /// Create a configuration with default timing knobs.
    #[must_use]
    pub fn new(primary_addr: impl Into<String>, backup_addr: impl Into<String>) -> Self {
        Self {
            primary_addr: primary_addr.into(),
            backup_addr: backup_addr.into(),
            ack_timeout: Duration::from_millis(500),
            window_size: 5,
            replay_gap: Duration::from_millis(10),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if an address is empty or the window size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.primary_addr.is_empty() || self.backup_addr.is_empty() {
            return Err(Error::configuration("broker addresses must not be empty"));
        }
        if self.window_size == 0 {
            return Err(Error::configuration("window size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_failover_contract() {
        let config = PublisherConfig::new("127.0.0.1:8080", "127.0.0.1:8081");
        assert_eq!(config.ack_timeout, Duration::from_millis(500));
        assert_eq!(config.window_size, 5);
        assert_eq!(config.replay_gap, Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_addresses() {
        assert!(PublisherConfig::new("", "127.0.0.1:8081").validate().is_err());
        assert!(PublisherConfig::new("127.0.0.1:8080", "").validate().is_err());
    }

    #[test]
    fn rejects_zero_window() {
        let mut config = PublisherConfig::new("a:1", "b:2");
        config.window_size = 0;
        assert!(config.validate().is_err());
    }
}

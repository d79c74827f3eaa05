//! # Tannoy Broker
//!
//! Topic-based pub/sub broker with hot-standby failover.
//!
//! A broker runs in one of two roles:
//! - **Primary** — accepts `PUBLISH` submissions, replicates each one to the
//!   configured backup before acknowledging, fans the payload out to the
//!   topic's subscribers, then tells the backup to clear its copy.
//! - **Backup** — buffers replicated publishes, probes the primary once per
//!   second, and on the first probe failure drains the buffer through its own
//!   publish path so no acknowledged-but-unfanned message is lost.
//!
//! Subscribers hold long-lived connections; publishers connect, submit one
//! message and are disconnected by the broker after fan-out.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use tannoy_broker::{Broker, BrokerConfig};
//!
//! # async fn example() -> tannoy_core::Result<()> {
//! let config = BrokerConfig::primary("127.0.0.1:8080", Some("127.0.0.1:8081".into()));
//! let handle = Broker::new(config)?.start().await?;
//! println!("listening on {}", handle.local_addr());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod broker;
pub mod config;
pub mod failover;
pub mod network;
pub mod replication;
pub mod routing;

pub use broker::{Broker, BrokerHandle};
pub use config::{BrokerConfig, RoleConfig};
pub use tannoy_core::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::{Broker, BrokerConfig, BrokerHandle, RoleConfig};
    pub use tannoy_core::prelude::*;
}

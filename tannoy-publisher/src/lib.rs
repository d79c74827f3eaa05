//! # Tannoy Publisher
//!
//! Publisher client with at-least-once delivery across a single broker
//! failure.
//!
//! Each message goes to the primary broker, which must acknowledge within a
//! deadline. The first missed acknowledgement switches the client to the
//! backup broker permanently for this run: the most recent messages (a
//! sliding window of five) are replayed to the backup without waiting for
//! acknowledgements, and all subsequent messages follow the same
//! fire-and-forget path. Duplicates are possible by design; subscribers must
//! tolerate them.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use tannoy_publisher::{FailoverPublisher, PublisherConfig};
//!
//! # async fn example() -> tannoy_core::Result<()> {
//! let config = PublisherConfig::new("127.0.0.1:8080", "127.0.0.1:8081");
//! let mut publisher = FailoverPublisher::new(config)?;
//! publisher.publish("weather", "sunny").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod publisher;
pub mod window;

pub use config::PublisherConfig;
pub use publisher::{Delivery, FailoverPublisher, PublishTarget};
pub use tannoy_core::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::{Delivery, FailoverPublisher, PublishTarget, PublisherConfig};
    pub use tannoy_core::prelude::*;
}

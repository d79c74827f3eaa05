//! # Tannoy Consumer
//!
//! Subscriber client for the Tannoy broker.
//!
//! A [`Subscription`] holds one persistent connection to a broker and yields
//! every payload published on its topic. For delivery across a broker
//! failure, subscribe to the primary and the backup at the same time and
//! tolerate duplicates: the at-least-once guarantee means a payload may
//! arrive on both connections.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use tannoy_consumer::Subscription;
//!
//! # async fn example() -> tannoy_core::Result<()> {
//! let mut subscription = Subscription::connect("127.0.0.1:8080", "weather").await?;
//! while let Some(payload) = subscription.next_payload().await? {
//!     println!("{payload}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod subscription;

pub use subscription::Subscription;
pub use tannoy_core::{Error, Result};

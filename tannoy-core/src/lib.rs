//! # Tannoy Core
//!
//! Shared building blocks for the Tannoy pub/sub broker:
//! - Line-framed control protocol (parse and serialize)
//! - Streaming frame decoder for socket readers
//! - Common error types
//!
//! The wire format is deliberately simple: one frame per line, three fields
//! separated by `|`. See the [`protocol`] module for the full grammar.
//!
//! ## Examples
//!
//! ```rust
//! use tannoy_core::protocol::Frame;
//!
//! let frame = Frame::publish("weather", "sunny")?;
//! assert_eq!(frame.to_wire(), "PUBLISH|weather|sunny\n");
//!
//! let parsed = Frame::parse("PUBLISH|weather|sunny")?.unwrap();
//! assert_eq!(parsed.topic(), "weather");
//! # Ok::<(), tannoy_core::protocol::ProtocolError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod protocol;

pub use error::{Error, Result};
pub use protocol::{Frame, FrameDecoder, FrameType};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::protocol::{Frame, FrameDecoder, FrameType, ProtocolError};
    pub use crate::{Error, Result};
}

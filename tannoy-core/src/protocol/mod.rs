//! Line-framed control protocol for broker and client communication.
//!
//! Every frame is a single line terminated by `\n`:
//!
//! ```text
//! TYPE|TOPIC|PAYLOAD
//! ```
//!
//! The line is split on the first two `|` only, so the payload may itself
//! contain `|`. Each field is trimmed of surrounding whitespace. The bare
//! control replies `ACK`, `PING` and `PONG` are emitted without delimiters;
//! on input the legacy probe framing `PING||` is accepted as well.
//!
//! ## Usage
//!
//! ```rust
//! use tannoy_core::protocol::{Frame, FrameDecoder, FrameType};
//!
//! let frame = Frame::replicate("metrics", "cpu=0.93")?;
//! let wire = frame.to_wire();
//!
//! let mut decoder = FrameDecoder::new();
//! decoder.push(wire.as_bytes());
//! let decoded = decoder.next_frame()?.unwrap();
//! assert_eq!(decoded.frame_type(), FrameType::Replicate);
//! # Ok::<(), tannoy_core::protocol::ProtocolError>(())
//! ```

pub mod codec;
pub mod error;
pub mod frame;

pub use codec::FrameDecoder;
pub use error::{ProtocolError, ProtocolResult};
pub use frame::Frame;

/// Field separator within a frame line.
pub const DELIMITER: char = '|';

/// Maximum accepted line length in bytes, including the terminator.
///
/// A connection streaming more than this without a newline is treated as
/// misbehaving and its input is rejected as malformed.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Control frame type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Submit one message for fan-out to a topic's subscribers.
    Publish,
    /// Register the sending connection as a subscriber of a topic.
    Subscribe,
    /// Primary-to-backup copy of an accepted publish.
    Replicate,
    /// Primary-to-backup notice that a replicated publish was fanned out.
    Clear,
    /// Broker-to-publisher delivery acknowledgement.
    Ack,
    /// Liveness probe request.
    Ping,
    /// Liveness probe reply.
    Pong,
}

impl FrameType {
    /// Wire name of this frame type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "PUBLISH",
            Self::Subscribe => "SUBSCRIBE",
            Self::Replicate => "REPLICATE",
            Self::Clear => "CLEAR",
            Self::Ack => "ACK",
            Self::Ping => "PING",
            Self::Pong => "PONG",
        }
    }

    /// Parse a wire name, matched case-sensitively.
    ///
    /// # Errors
    /// Returns [`ProtocolError::UnknownFrameType`] for any name outside the
    /// enumerated set.
    pub fn from_name(name: &str) -> ProtocolResult<Self> {
        match name {
            "PUBLISH" => Ok(Self::Publish),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "REPLICATE" => Ok(Self::Replicate),
            "CLEAR" => Ok(Self::Clear),
            "ACK" => Ok(Self::Ack),
            "PING" => Ok(Self::Ping),
            "PONG" => Ok(Self::Pong),
            _ => Err(ProtocolError::UnknownFrameType { name: name.to_string() }),
        }
    }

    /// Whether frames of this type name a topic.
    #[must_use]
    pub const fn carries_topic(self) -> bool {
        matches!(self, Self::Publish | Self::Subscribe | Self::Replicate | Self::Clear)
    }

    /// Whether this type is a bare control reply, serialized without
    /// delimiters.
    #[must_use]
    pub const fn is_bare(self) -> bool {
        matches!(self, Self::Ack | Self::Ping | Self::Pong)
    }
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

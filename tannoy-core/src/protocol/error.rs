//! Protocol-specific error types.

use thiserror::Error;

/// Errors produced while parsing or constructing wire frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Line contains no field separator at all.
    #[error("malformed frame (no '|' separator): {line:?}")]
    MissingDelimiter {
        /// The offending line, trimmed.
        line: String,
    },

    /// Frame type name outside the enumerated set.
    #[error("unknown frame type: {name:?}")]
    UnknownFrameType {
        /// The unrecognized type field.
        name: String,
    },

    /// A topic-carrying frame arrived with an empty topic field.
    #[error("empty topic in {frame_type} frame")]
    EmptyTopic {
        /// Type of the offending frame.
        frame_type: crate::protocol::FrameType,
    },

    /// Topic contains the delimiter, the line terminator, or another
    /// non-printable character.
    #[error("invalid character {character:?} in topic {topic:?}")]
    InvalidTopic {
        /// The offending topic field.
        topic: String,
        /// First invalid character found.
        character: char,
    },

    /// Payload contains a line terminator, which would break framing.
    #[error("payload contains a line terminator")]
    PayloadLineBreak,

    /// Line exceeds [`MAX_LINE_LENGTH`](crate::protocol::MAX_LINE_LENGTH)
    /// without a terminator.
    #[error("line length {actual} exceeds maximum {max}")]
    LineTooLong {
        /// Bytes buffered so far.
        actual: usize,
        /// Maximum allowed line length.
        max: usize,
    },

    /// Input bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidEncoding,
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameType;

    #[test]
    fn display_formats() {
        let err = ProtocolError::MissingDelimiter { line: "HELLO".into() };
        assert_eq!(err.to_string(), "malformed frame (no '|' separator): \"HELLO\"");

        let err = ProtocolError::EmptyTopic { frame_type: FrameType::Subscribe };
        assert_eq!(err.to_string(), "empty topic in SUBSCRIBE frame");

        let err = ProtocolError::LineTooLong { actual: 70_000, max: 65_536 };
        assert_eq!(err.to_string(), "line length 70000 exceeds maximum 65536");
    }
}

//! Frame structure and line-level parse/serialize operations.

use crate::protocol::{FrameType, ProtocolError, ProtocolResult, DELIMITER};
use std::fmt;

/// One control frame: `(type, topic, payload)`.
///
/// `topic` and `payload` are empty for the bare control types (`ACK`, `PING`,
/// `PONG`). The payload may contain the delimiter character; neither field may
/// contain a line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    frame_type: FrameType,
    topic: String,
    payload: String,
}

impl Frame {
    /// Create a frame, validating the topic and payload fields.
    ///
    /// # Errors
    /// Returns an error if a topic-carrying type has an empty or invalid
    /// topic, or if the payload contains a line terminator.
    pub fn new(
        frame_type: FrameType,
        topic: impl Into<String>,
        payload: impl Into<String>,
    ) -> ProtocolResult<Self> {
        let topic = topic.into();
        let payload = payload.into();

        if frame_type.carries_topic() {
            if topic.is_empty() {
                return Err(ProtocolError::EmptyTopic { frame_type });
            }
            if let Some(character) =
                topic.chars().find(|&c| c == DELIMITER || c.is_control())
            {
                return Err(ProtocolError::InvalidTopic { topic, character });
            }
        }

        if payload.contains('\n') || payload.contains('\r') {
            return Err(ProtocolError::PayloadLineBreak);
        }

        Ok(Self { frame_type, topic, payload })
    }

    /// Create a `PUBLISH` frame.
    ///
    /// # Errors
    /// Returns an error if the topic is empty or invalid.
    pub fn publish(topic: impl Into<String>, payload: impl Into<String>) -> ProtocolResult<Self> {
        Self::new(FrameType::Publish, topic, payload)
    }

    /// Create a `SUBSCRIBE` frame.
    ///
    /// # Errors
    /// Returns an error if the topic is empty or invalid.
    pub fn subscribe(topic: impl Into<String>) -> ProtocolResult<Self> {
        Self::new(FrameType::Subscribe, topic, String::new())
    }

    /// Create a `REPLICATE` frame.
    ///
    /// # Errors
    /// Returns an error if the topic is empty or invalid.
    pub fn replicate(topic: impl Into<String>, payload: impl Into<String>) -> ProtocolResult<Self> {
        Self::new(FrameType::Replicate, topic, payload)
    }

    /// Create a `CLEAR` frame.
    ///
    /// # Errors
    /// Returns an error if the topic is empty or invalid.
    pub fn clear(topic: impl Into<String>, payload: impl Into<String>) -> ProtocolResult<Self> {
        Self::new(FrameType::Clear, topic, payload)
    }

    /// Create a bare `ACK` frame.
    #[must_use]
    pub const fn ack() -> Self {
        Self { frame_type: FrameType::Ack, topic: String::new(), payload: String::new() }
    }

    /// Create a bare `PING` frame.
    #[must_use]
    pub const fn ping() -> Self {
        Self { frame_type: FrameType::Ping, topic: String::new(), payload: String::new() }
    }

    /// Create a bare `PONG` frame.
    #[must_use]
    pub const fn pong() -> Self {
        Self { frame_type: FrameType::Pong, topic: String::new(), payload: String::new() }
    }

    /// Derive the `REPLICATE` copy of this frame, preserving topic and
    /// payload.
    ///
    /// Infallible: the fields were validated when this frame was built.
    #[must_use]
    pub fn as_replicate(&self) -> Self {
        Self {
            frame_type: FrameType::Replicate,
            topic: self.topic.clone(),
            payload: self.payload.clone(),
        }
    }

    /// Derive the `CLEAR` counterpart of this frame, preserving topic and
    /// payload.
    #[must_use]
    pub fn as_clear(&self) -> Self {
        Self { frame_type: FrameType::Clear, topic: self.topic.clone(), payload: self.payload.clone() }
    }

    /// Parse one wire line into a frame.
    ///
    /// The line is split on the first two delimiters only; all three fields
    /// are trimmed of surrounding whitespace. A blank line yields `Ok(None)`
    /// and is skipped by callers. A trailing line terminator is tolerated.
    ///
    /// # Errors
    /// Returns an error when the line has no delimiter, names an unknown
    /// type, or carries an empty or invalid topic.
    pub fn parse(line: &str) -> ProtocolResult<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some((name, rest)) = line.split_once(DELIMITER) else {
            return Err(ProtocolError::MissingDelimiter { line: line.to_string() });
        };
        let (topic, payload) = match rest.split_once(DELIMITER) {
            Some((topic, payload)) => (topic, payload),
            None => (rest, ""),
        };

        let frame_type = FrameType::from_name(name.trim())?;
        Self::new(frame_type, topic.trim(), payload.trim()).map(Some)
    }

    /// Serialize to the wire form, including the trailing line terminator.
    ///
    /// Bare control types are emitted without delimiters (`ACK\n`, `PING\n`,
    /// `PONG\n`); all others as `TYPE|TOPIC|PAYLOAD\n`.
    #[must_use]
    pub fn to_wire(&self) -> String {
        if self.frame_type.is_bare() {
            format!("{}\n", self.frame_type)
        } else {
            format!("{}|{}|{}\n", self.frame_type, self.topic, self.payload)
        }
    }

    /// Get the frame type.
    #[must_use]
    pub const fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Get the topic field.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Get the payload field.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Decompose into `(type, topic, payload)`.
    #[must_use]
    pub fn into_parts(self) -> (FrameType, String, String) {
        (self.frame_type, self.topic, self.payload)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frame_type.is_bare() {
            write!(f, "{}", self.frame_type)
        } else {
            write!(f, "{}|{}|{}", self.frame_type, self.topic, self.payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_publish() {
        let frame = Frame::parse("PUBLISH|weather|sunny\n").unwrap().unwrap();
        assert_eq!(frame.frame_type(), FrameType::Publish);
        assert_eq!(frame.topic(), "weather");
        assert_eq!(frame.payload(), "sunny");
    }

    #[test]
    fn parse_subscribe_without_payload_field() {
        // The subscriber CLI sends two fields only.
        let frame = Frame::parse("SUBSCRIBE|weather").unwrap().unwrap();
        assert_eq!(frame.frame_type(), FrameType::Subscribe);
        assert_eq!(frame.topic(), "weather");
        assert_eq!(frame.payload(), "");
    }

    #[test]
    fn parse_trims_fields() {
        let frame = Frame::parse("  PUBLISH | weather | sunny \n").unwrap().unwrap();
        assert_eq!(frame.topic(), "weather");
        assert_eq!(frame.payload(), "sunny");
    }

    #[test]
    fn payload_keeps_extra_delimiters() {
        let frame = Frame::parse("PUBLISH|t|a|b|c").unwrap().unwrap();
        assert_eq!(frame.payload(), "a|b|c");
    }

    #[test]
    fn blank_line_is_skipped() {
        assert_eq!(Frame::parse("").unwrap(), None);
        assert_eq!(Frame::parse("   \n").unwrap(), None);
    }

    #[test]
    fn missing_delimiter_rejected() {
        let err = Frame::parse("HELLO\n").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingDelimiter { .. }));
    }

    #[test]
    fn unknown_type_rejected() {
        let err = Frame::parse("SHOUT|t|x").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownFrameType { .. }));
    }

    #[test]
    fn empty_topic_rejected() {
        let err = Frame::parse("PUBLISH||x").unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyTopic { .. }));
    }

    #[test]
    fn legacy_ping_framing_accepted() {
        let frame = Frame::parse("PING||\n").unwrap().unwrap();
        assert_eq!(frame.frame_type(), FrameType::Ping);
    }

    #[test]
    fn bare_replies_serialize_without_delimiters() {
        assert_eq!(Frame::ack().to_wire(), "ACK\n");
        assert_eq!(Frame::ping().to_wire(), "PING\n");
        assert_eq!(Frame::pong().to_wire(), "PONG\n");
    }

    #[test]
    fn wire_round_trip() {
        let original = Frame::publish("metrics", "cpu=0.93|mem=0.41").unwrap();
        let parsed = Frame::parse(&original.to_wire()).unwrap().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn replication_frames_derive_from_publish() {
        let publish = Frame::publish("t", "42").unwrap();
        assert_eq!(publish.as_replicate().to_wire(), "REPLICATE|t|42\n");
        assert_eq!(publish.as_clear().to_wire(), "CLEAR|t|42\n");
    }

    #[test]
    fn invalid_topic_rejected() {
        assert!(Frame::publish("bad\ttopic", "x").is_err());
        assert!(Frame::subscribe("").is_err());
    }

    #[test]
    fn payload_line_break_rejected() {
        let err = Frame::publish("t", "two\nlines").unwrap_err();
        assert_eq!(err, ProtocolError::PayloadLineBreak);
    }
}

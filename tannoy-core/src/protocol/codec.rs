//! Streaming frame decoder with line boundary detection.

use crate::protocol::{Frame, ProtocolError, ProtocolResult, MAX_LINE_LENGTH};
use bytes::BytesMut;

/// Incremental decoder that turns a byte stream into frames.
///
/// Bytes are accumulated with [`push`](Self::push) and complete lines are
/// drained with [`next_frame`](Self::next_frame); a partial line stays
/// buffered until its terminator arrives. Blank lines are consumed silently.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Accumulated bytes awaiting a line terminator.
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a decoder with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a decoder with the given initial buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(capacity) }
    }

    /// Append raw bytes read from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extract the next complete frame, if one is buffered.
    ///
    /// Returns `Ok(None)` when no complete line is available yet.
    ///
    /// # Errors
    /// Returns an error for a malformed line, for input that is not UTF-8,
    /// or when the buffer exceeds [`MAX_LINE_LENGTH`] without a terminator.
    pub fn next_frame(&mut self) -> ProtocolResult<Option<Frame>> {
        loop {
            let Some(index) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.buffer.len() > MAX_LINE_LENGTH {
                    return Err(ProtocolError::LineTooLong {
                        actual: self.buffer.len(),
                        max: MAX_LINE_LENGTH,
                    });
                }
                return Ok(None);
            };

            let line = self.buffer.split_to(index + 1);
            let text =
                std::str::from_utf8(&line).map_err(|_| ProtocolError::InvalidEncoding)?;
            // A blank line parses to None and is consumed by the next scan.
            if let Some(frame) = Frame::parse(text)? {
                return Ok(Some(frame));
            }
        }
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameType;

    #[test]
    fn decodes_single_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"PUBLISH|t|hello\n");
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.frame_type(), FrameType::Publish);
        assert_eq!(frame.payload(), "hello");
        assert_eq!(decoder.next_frame().unwrap(), None);
    }

    #[test]
    fn partial_line_stays_buffered() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"PUBLISH|t|hel");
        assert_eq!(decoder.next_frame().unwrap(), None);
        assert_eq!(decoder.buffered(), 13);

        decoder.push(b"lo\n");
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.payload(), "hello");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn decodes_multiple_frames_from_one_push() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"SUBSCRIBE|a\nSUBSCRIBE|b\nPUBLISH|a|x\n");

        let topics: Vec<String> = std::iter::from_fn(|| {
            decoder.next_frame().unwrap().map(|f| f.topic().to_string())
        })
        .collect();
        assert_eq!(topics, ["a", "b", "a"]);
    }

    #[test]
    fn blank_lines_are_consumed() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"\n\nPING||\n\n");
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.frame_type(), FrameType::Ping);
        assert_eq!(decoder.next_frame().unwrap(), None);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn malformed_line_propagates_error() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"HELLO\n");
        assert!(matches!(
            decoder.next_frame(),
            Err(ProtocolError::MissingDelimiter { .. })
        ));
    }

    #[test]
    fn frames_before_malformed_line_are_yielded() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"SUBSCRIBE|t\nGARBAGE\n");
        assert!(decoder.next_frame().unwrap().is_some());
        assert!(decoder.next_frame().is_err());
    }

    #[test]
    fn unterminated_overlong_line_rejected() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&vec![b'a'; MAX_LINE_LENGTH + 1]);
        assert!(matches!(
            decoder.next_frame(),
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[test]
    fn non_utf8_input_rejected() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"PUBLISH|t|\xff\xfe\n");
        assert_eq!(decoder.next_frame(), Err(ProtocolError::InvalidEncoding));
    }
}

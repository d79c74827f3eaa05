//! One persistent subscription to a single broker.

use tannoy_core::protocol::Frame;
use tannoy_core::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// A live subscription: connected, registered, receiving payload lines.
#[derive(Debug)]
pub struct Subscription {
    reader: BufReader<TcpStream>,
}

impl Subscription {
    /// Connect to a broker and subscribe to `topic`.
    ///
    /// # Errors
    /// Returns an error if the topic is invalid, the broker is unreachable,
    /// or the subscribe write fails.
    pub async fn connect(addr: &str, topic: &str) -> Result<Self> {
        let frame = Frame::subscribe(topic)?;
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::network(format!("failed to connect to {addr}: {e}")))?;
        stream.write_all(frame.to_wire().as_bytes()).await?;
        Ok(Self { reader: BufReader::new(stream) })
    }

    /// Wait for the next published payload.
    ///
    /// Returns `Ok(None)` when the broker closes the connection.
    ///
    /// # Errors
    /// Returns an error if the transport read fails.
    pub async fn next_payload(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

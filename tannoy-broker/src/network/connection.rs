//! Connection identity and write-side state for inbound clients.
//!
//! The read half of every accepted socket is owned by its reader task (see
//! [`listener`](crate::network::listener)); the write half lives in a shared
//! [`ClientConnection`] so the broker core can acknowledge publishers and fan
//! messages out to subscribers without touching the reader.

use dashmap::DashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tannoy_core::protocol::Frame;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Unique identifier for a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new unique connection ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared write-side handle to one inbound connection.
#[derive(Debug)]
pub struct ClientConnection {
    /// Unique connection identifier.
    id: ConnectionId,
    /// Remote socket address.
    remote_addr: SocketAddr,
    /// Write half of the socket; `None` once the connection is closed.
    writer: Mutex<Option<OwnedWriteHalf>>,
}

impl ClientConnection {
    /// Wrap the write half of an accepted socket.
    #[must_use]
    pub fn new(id: ConnectionId, remote_addr: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self { id, remote_addr, writer: Mutex::new(Some(writer)) }
    }

    /// Get the connection ID.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the remote socket address.
    #[must_use]
    pub const fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Write a serialized frame to the peer.
    ///
    /// # Errors
    /// Returns an error if the connection is already closed or the transport
    /// write fails.
    pub async fn send_frame(&self, frame: &Frame) -> std::io::Result<()> {
        self.write_all(frame.to_wire().as_bytes()).await
    }

    /// Write one payload line (`payload\n`) to the peer.
    ///
    /// # Errors
    /// Returns an error if the connection is already closed or the transport
    /// write fails.
    pub async fn send_line(&self, payload: &str) -> std::io::Result<()> {
        let mut line = String::with_capacity(payload.len() + 1);
        line.push_str(payload);
        line.push('\n');
        self.write_all(line.as_bytes()).await
    }

    async fn write_all(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(writer) => writer.write_all(bytes).await,
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection closed",
            )),
        }
    }

    /// Close the write side of the connection. Idempotent.
    pub async fn close(&self) {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            let _ = writer.shutdown().await;
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub async fn is_closed(&self) -> bool {
        self.writer.lock().await.is_none()
    }
}

impl PartialEq for ClientConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientConnection {}

/// Registry of connections currently owned by the multiplexer.
///
/// A publisher connection leaves the registry the moment its `PUBLISH` frame
/// is handed to the core; subscriber connections stay until their reader
/// observes end-of-stream or an error.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// Live connections by ID.
    connections: DashMap<ConnectionId, Arc<ClientConnection>>,
    /// Total connections accepted over the process lifetime.
    accepted: AtomicU64,
}

impl ConnectionManager {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly accepted connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(connection.id(), connection);
    }

    /// Stop tracking a connection. Idempotent.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.remove(&id).map(|(_, conn)| conn)
    }

    /// Whether a connection is currently tracked.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Number of currently tracked connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Total connections accepted over the process lifetime.
    #[must_use]
    pub fn total_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

//! TCP accept loop and per-connection frame readers.
//!
//! Each accepted socket gets its own reader task, which preserves frame order
//! per connection. Parsed frames flow to the core dispatcher over a bounded
//! channel; disconnects flow over a second bounded channel, emitted at most
//! once per connection.

use crate::network::connection::{ClientConnection, ConnectionId, ConnectionManager};
use bytes::BytesMut;
use std::sync::Arc;
use std::time::Duration;
use tannoy_core::protocol::{Frame, FrameDecoder, FrameType};
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A parsed frame paired with the connection it arrived on.
#[derive(Debug)]
pub struct Inbound {
    /// The parsed control frame.
    pub frame: Frame,
    /// Connection the frame was read from.
    pub conn: Arc<ClientConnection>,
}

/// Pause after a failed accept before retrying.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accept inbound connections and spawn a reader task for each.
///
/// Accept failures are logged and the loop continues; only dropping the
/// listener ends it.
pub(crate) async fn run_accept_loop(
    listener: TcpListener,
    connections: Arc<ConnectionManager>,
    frames: mpsc::Sender<Inbound>,
    disconnects: mpsc::Sender<Arc<ClientConnection>>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(%addr, error = %e, "failed to set TCP_NODELAY");
                }
                let (read_half, write_half) = stream.into_split();
                let conn =
                    Arc::new(ClientConnection::new(ConnectionId::new(), addr, write_half));
                info!(conn = %conn.id(), %addr, "accepted connection");
                connections.add(Arc::clone(&conn));

                tokio::spawn(drive_connection(
                    conn,
                    read_half,
                    Arc::clone(&connections),
                    frames.clone(),
                    disconnects.clone(),
                ));
            },
            Err(e) => {
                error!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            },
        }
    }
}

/// Read frames from one connection until it disconnects or is handed off.
///
/// `PING` is answered in place and never reaches the dispatcher. A `PUBLISH`
/// frame hands the whole connection to the core, which owns closing it after
/// fan-out; the reader exits without emitting a disconnect in that case.
async fn drive_connection(
    conn: Arc<ClientConnection>,
    mut read_half: OwnedReadHalf,
    connections: Arc<ConnectionManager>,
    frames: mpsc::Sender<Inbound>,
    disconnects: mpsc::Sender<Arc<ClientConnection>>,
) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = BytesMut::with_capacity(1024);

    'connection: loop {
        chunk.clear();
        match read_half.read_buf(&mut chunk).await {
            Ok(0) => {
                debug!(conn = %conn.id(), "peer closed connection");
                break 'connection;
            },
            Ok(_) => decoder.push(&chunk),
            Err(e) => {
                warn!(conn = %conn.id(), error = %e, "read failed");
                break 'connection;
            },
        }

        loop {
            let frame = match decoder.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(conn = %conn.id(), error = %e, "closing connection after malformed frame");
                    break 'connection;
                },
            };

            match frame.frame_type() {
                FrameType::Ping => {
                    debug!(conn = %conn.id(), "answering liveness probe");
                    if conn.send_frame(&Frame::pong()).await.is_err() {
                        break 'connection;
                    }
                },
                FrameType::Publish => {
                    // Publisher contract: the multiplexer drops its handle as
                    // soon as the frame is handed off.
                    connections.remove(conn.id());
                    let _ = frames.send(Inbound { frame, conn }).await;
                    return;
                },
                _ => {
                    if frames.send(Inbound { frame, conn: Arc::clone(&conn) }).await.is_err() {
                        return;
                    }
                },
            }
        }
    }

    connections.remove(conn.id());
    let _ = disconnects.send(conn).await;
}

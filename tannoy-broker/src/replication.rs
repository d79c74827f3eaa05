//! Primary/backup replication: the outbound link and the replica buffer.
//!
//! The primary keeps one persistent TCP session to its backup and forwards
//! `REPLICATE` and `CLEAR` frames over it in submission order. The backup
//! holds the set of replicated-but-not-cleared publishes; that set is what
//! the takeover drain delivers if the primary is lost.

use std::collections::HashSet;
use std::time::Duration;
use tannoy_core::protocol::Frame;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Interval between dial attempts while the link is being established.
const REDIAL_INTERVAL: Duration = Duration::from_secs(2);

/// Persistent outbound session from the primary to its backup.
///
/// The link starts detached and is attached once by the dialer task. A write
/// failure detaches it for the rest of the run: subsequent publishes are
/// unreplicated but still succeed.
#[derive(Debug, Default)]
pub struct ReplicationLink {
    stream: Mutex<Option<TcpStream>>,
}

impl ReplicationLink {
    /// Create a detached link.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an established session.
    pub async fn attach(&self, stream: TcpStream) {
        *self.stream.lock().await = Some(stream);
    }

    /// Whether a session is currently attached.
    pub async fn is_attached(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Forward one frame to the backup.
    ///
    /// A detached link ignores the frame. A write failure logs, detaches the
    /// link and returns; the caller proceeds regardless, so an unreplicated
    /// primary keeps serving.
    pub async fn forward(&self, frame: &Frame) {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return;
        };
        if let Err(e) = stream.write_all(frame.to_wire().as_bytes()).await {
            warn!(error = %e, "replication write failed, detaching link");
            *guard = None;
        } else {
            debug!(%frame, "forwarded to backup");
        }
    }
}

/// Dial the backup until one session is established, then attach it.
///
/// Retries every two seconds. Runs once per process; the link is not
/// re-established after a later write failure.
pub(crate) async fn run_dialer(link: std::sync::Arc<ReplicationLink>, backup_addr: String) {
    loop {
        match TcpStream::connect(&backup_addr).await {
            Ok(stream) => {
                info!(addr = %backup_addr, "connected to backup broker");
                link.attach(stream).await;
                return;
            },
            Err(e) => {
                warn!(addr = %backup_addr, error = %e, "backup dial failed, retrying in 2s");
                tokio::time::sleep(REDIAL_INTERVAL).await;
            },
        }
    }
}

/// One buffered publish: `(topic, payload)`.
pub type ReplicaEntry = (String, String);

/// Backup-side set of publishes the primary accepted but has not confirmed
/// fanning out.
///
/// Entries are keyed by the exact `(topic, payload)` pair, so duplicate
/// replicates collapse. The takeover drain holds the lock for its full
/// duration, which makes the snapshot-drain-clear sequence atomic with
/// respect to concurrent `REPLICATE` frames from a recovering primary.
#[derive(Debug, Default)]
pub struct ReplicaBuffer {
    entries: Mutex<HashSet<ReplicaEntry>>,
}

impl ReplicaBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a replicated publish. Returns `false` if the exact pair was
    /// already buffered.
    pub async fn insert(&self, topic: &str, payload: &str) -> bool {
        self.entries.lock().await.insert((topic.to_string(), payload.to_string()))
    }

    /// Forget a publish the primary has confirmed fanning out. Returns
    /// `false` if the pair was not buffered.
    pub async fn remove(&self, topic: &str, payload: &str) -> bool {
        self.entries.lock().await.remove(&(topic.to_string(), payload.to_string()))
    }

    /// Number of buffered entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the buffer is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Lock the underlying set for the duration of a takeover drain.
    pub async fn lock(&self) -> MutexGuard<'_, HashSet<ReplicaEntry>> {
        self.entries.lock().await
    }
}

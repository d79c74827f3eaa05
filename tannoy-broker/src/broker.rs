//! Role-aware broker core.
//!
//! One dispatcher task drains two bounded queues — parsed frames and
//! disconnect events — so subscriber-map mutations and fan-out decisions
//! observe a total order. Publishes are processed serially, one at a time.
//!
//! On the primary, each accepted publish walks a fixed sequence:
//! replicate, acknowledge, simulate downstream work, fan out, clear,
//! close the publisher. The replicate-before-acknowledge ordering is what
//! makes the backup's replica buffer a superset of every acknowledged but
//! possibly unfanned message.

use crate::config::{BrokerConfig, RoleConfig};
use crate::failover::{self, PrimaryLatch};
use crate::network::{self, ClientConnection, ConnectionManager, Inbound};
use crate::replication::{self, ReplicaBuffer, ReplicationLink};
use crate::routing::RoutingTable;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tannoy_core::protocol::{Frame, FrameType};
use tannoy_core::{Error, Result};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Depth of the frame and disconnect queues.
const EVENT_QUEUE_DEPTH: usize = 10;

/// Bounds of the simulated downstream processing delay, in milliseconds.
///
/// This window is behavioral: it is the interval within which a primary can
/// die after replicating but before clearing, which is exactly the case the
/// backup's takeover drain exists for.
const COMPUTE_DELAY_MS: std::ops::RangeInclusive<u64> = 50..=150;

/// Role-specific broker state.
#[derive(Debug)]
pub(crate) enum Role {
    /// Primary: owns the replication link (detached when no backup is
    /// configured or after the first write failure).
    Primary {
        /// Outbound session to the backup.
        link: Arc<ReplicationLink>,
    },
    /// Backup: owns the liveness latch and the replica buffer.
    Backup {
        /// Latched view of the primary's liveness.
        latch: PrimaryLatch,
        /// Replicated-but-not-cleared publishes.
        buffer: ReplicaBuffer,
    },
}

/// A running broker instance.
#[derive(Debug)]
pub struct Broker {
    config: BrokerConfig,
}

/// Handle to a started broker's tasks.
#[derive(Debug)]
pub struct BrokerHandle {
    local_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl BrokerHandle {
    /// Address the broker is listening on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Abort all broker tasks. Shutdown is abrupt; in-flight work is
    /// dropped.
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Broker {
    /// Create a broker from a validated configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: BrokerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Bind the listener and start the broker tasks.
    ///
    /// # Errors
    /// Returns an error if the listener cannot bind to the configured
    /// address; nothing else at startup is fatal.
    pub async fn start(self) -> Result<BrokerHandle> {
        let listener = TcpListener::bind(&self.config.bind_addr).await.map_err(|e| {
            Error::network(format!("failed to bind {}: {e}", self.config.bind_addr))
        })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, role = self.config.role_name(), "broker listening");

        let (frames_tx, frames_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (disconnects_tx, disconnects_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let connections = Arc::new(ConnectionManager::new());
        let mut tasks = Vec::new();

        let role = match &self.config.role {
            RoleConfig::Primary { backup_addr } => {
                let link = Arc::new(ReplicationLink::new());
                if let Some(addr) = backup_addr {
                    tasks.push(tokio::spawn(replication::run_dialer(
                        Arc::clone(&link),
                        addr.clone(),
                    )));
                }
                Role::Primary { link }
            },
            RoleConfig::Backup { .. } => {
                Role::Backup { latch: PrimaryLatch::new(), buffer: ReplicaBuffer::new() }
            },
        };

        let core = Arc::new(Core {
            routing: RoutingTable::new(),
            disconnects: disconnects_tx.clone(),
            role,
        });

        if let RoleConfig::Backup { primary_addr } = &self.config.role {
            tasks.push(tokio::spawn(failover::run_prober(
                Arc::clone(&core),
                primary_addr.clone(),
            )));
        }

        tasks.push(tokio::spawn(Arc::clone(&core).run(frames_rx, disconnects_rx)));
        tasks.push(tokio::spawn(network::run_accept_loop(
            listener,
            connections,
            frames_tx,
            disconnects_tx,
        )));

        Ok(BrokerHandle { local_addr, tasks })
    }
}

/// Single-consumer dispatcher state shared with the prober.
#[derive(Debug)]
pub(crate) struct Core {
    routing: RoutingTable,
    disconnects: mpsc::Sender<Arc<ClientConnection>>,
    role: Role,
}

impl Core {
    /// Role accessor for the prober.
    pub(crate) fn role(&self) -> &Role {
        &self.role
    }

    /// Drain both event queues until every sender is gone.
    pub(crate) async fn run(
        self: Arc<Self>,
        mut frames: mpsc::Receiver<Inbound>,
        mut disconnects: mpsc::Receiver<Arc<ClientConnection>>,
    ) {
        loop {
            tokio::select! {
                inbound = frames.recv() => match inbound {
                    Some(inbound) => self.dispatch(inbound).await,
                    None => break,
                },
                conn = disconnects.recv() => match conn {
                    Some(conn) => self.handle_disconnect(&conn).await,
                    None => break,
                },
            }
        }
        debug!("dispatcher stopped");
    }

    /// Apply one parsed frame according to the broker role.
    async fn dispatch(&self, inbound: Inbound) {
        let Inbound { frame, conn } = inbound;
        match frame.frame_type() {
            FrameType::Subscribe => {
                info!(conn = %conn.id(), topic = frame.topic(), "subscriber attached");
                self.routing.attach(frame.topic(), conn);
            },
            FrameType::Publish => match &self.role {
                Role::Primary { link } => self.publish_primary(link, &frame, &conn).await,
                Role::Backup { latch, .. } => {
                    if latch.is_alive() {
                        // The primary is serving; an externally originated
                        // publish here is the client's failover replay and
                        // must not be double-delivered.
                        debug!(topic = frame.topic(), "dropping publish while primary is alive");
                        conn.close().await;
                    } else {
                        self.publish_backup(frame.topic(), frame.payload(), Some(&conn)).await;
                    }
                },
            },
            FrameType::Replicate => match &self.role {
                Role::Backup { buffer, .. } => {
                    buffer.insert(frame.topic(), frame.payload()).await;
                    info!(topic = frame.topic(), payload = frame.payload(), "replicated");
                },
                Role::Primary { .. } => {
                    debug!(topic = frame.topic(), "ignoring REPLICATE on primary");
                },
            },
            FrameType::Clear => match &self.role {
                Role::Backup { buffer, .. } => {
                    buffer.remove(frame.topic(), frame.payload()).await;
                    info!(topic = frame.topic(), payload = frame.payload(), "cleared");
                },
                Role::Primary { .. } => {
                    debug!(topic = frame.topic(), "ignoring CLEAR on primary");
                },
            },
            // PING is answered by the reader; ACK and PONG have no business
            // arriving at a broker.
            FrameType::Ping | FrameType::Pong | FrameType::Ack => {
                debug!(conn = %conn.id(), frame = %frame, "ignoring control frame");
            },
        }
    }

    /// Primary publish path: replicate, acknowledge, process, fan out,
    /// clear, close.
    async fn publish_primary(
        &self,
        link: &ReplicationLink,
        frame: &Frame,
        publisher: &Arc<ClientConnection>,
    ) {
        // Replicate before acknowledging: once the publisher sees ACK, the
        // message is recoverable from the backup.
        link.forward(&frame.as_replicate()).await;

        if let Err(e) = publisher.send_frame(&Frame::ack()).await {
            warn!(conn = %publisher.id(), error = %e, "failed to acknowledge publisher");
        }

        self.process_publish(frame.topic(), frame.payload()).await;

        link.forward(&frame.as_clear()).await;

        publisher.close().await;
        info!(conn = %publisher.id(), "publisher disconnected");
    }

    /// Backup publish path: process and fan out, no replication, no ACK.
    ///
    /// Used for the takeover drain (no originating publisher) and for live
    /// publishes once the primary is gone.
    async fn publish_backup(
        &self,
        topic: &str,
        payload: &str,
        publisher: Option<&Arc<ClientConnection>>,
    ) {
        self.process_publish(topic, payload).await;

        if let Some(conn) = publisher {
            conn.close().await;
            info!(conn = %conn.id(), "publisher disconnected");
        }
    }

    /// Simulated downstream processing followed by fan-out to the topic's
    /// subscribers.
    async fn process_publish(&self, topic: &str, payload: &str) {
        let delay_ms = rand::thread_rng().gen_range(COMPUTE_DELAY_MS);
        debug!(delay_ms, topic, "computing");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let subscribers = self.routing.snapshot(topic);
        info!(topic, payload, subscribers = subscribers.len(), "publishing message");

        for subscriber in subscribers {
            if let Err(e) = subscriber.send_line(payload).await {
                warn!(conn = %subscriber.id(), error = %e, "subscriber write failed");
                self.schedule_disconnect(subscriber).await;
            }
        }
    }

    /// Queue a disconnect event for a failed subscriber.
    ///
    /// The dispatcher is the queue's only consumer, so when the queue is
    /// full the event is handled inline instead of blocking on ourselves.
    async fn schedule_disconnect(&self, conn: Arc<ClientConnection>) {
        match self.disconnects.try_send(conn) {
            Ok(()) => {},
            Err(mpsc::error::TrySendError::Full(conn)) => self.handle_disconnect(&conn).await,
            Err(mpsc::error::TrySendError::Closed(_)) => {},
        }
    }

    /// Detach a connection from every topic and close it.
    async fn handle_disconnect(&self, conn: &Arc<ClientConnection>) {
        let removed = self.routing.detach(conn.id());
        if removed > 0 {
            info!(conn = %conn.id(), bindings = removed, "subscriber removed");
        }
        conn.close().await;
    }

    /// One-shot takeover drain: deliver every buffered publish through the
    /// normal backup publish path, then empty the buffer.
    ///
    /// The buffer lock is held for the full drain, so replicates from a
    /// recovering primary are accepted only after the drain completes.
    pub(crate) async fn take_over(&self) {
        let Role::Backup { buffer, .. } = &self.role else {
            return;
        };

        let mut entries = buffer.lock().await;
        warn!(pending = entries.len(), "taking over from lost primary");

        let pending: Vec<(String, String)> = entries.iter().cloned().collect();
        for (topic, payload) in &pending {
            self.publish_backup(topic, payload, None).await;
        }
        entries.clear();

        info!(drained = pending.len(), "takeover complete");
    }
}

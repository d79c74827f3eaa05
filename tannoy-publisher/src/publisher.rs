//! Failover publisher state machine.

use crate::config::PublisherConfig;
use crate::window::ReplayWindow;
use tannoy_core::protocol::Frame;
use tannoy_core::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Which broker the publisher currently targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTarget {
    /// Publishing to the primary and waiting for acknowledgements.
    Primary,
    /// Failed over; publishing to the backup fire-and-forget.
    Backup,
}

/// Outcome of one publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The primary acknowledged within the deadline.
    Acknowledged,
    /// The primary missed the deadline; the window was replayed to the
    /// backup and the publisher switched target for the rest of the run.
    FailedOver,
    /// Sent to the backup without waiting for an acknowledgement.
    SentToBackup,
}

/// Publisher with at-least-once delivery across a single broker failure.
///
/// The switch to the backup is one-way: once an acknowledgement is missed,
/// the primary is never retried.
#[derive(Debug)]
pub struct FailoverPublisher {
    config: PublisherConfig,
    window: ReplayWindow,
    target: PublishTarget,
    next_seq: u64,
}

impl FailoverPublisher {
    /// Create a publisher from a validated configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: PublisherConfig) -> Result<Self> {
        config.validate()?;
        let window = ReplayWindow::new(config.window_size);
        Ok(Self { config, window, target: PublishTarget::Primary, next_seq: 1 })
    }

    /// Current publish target.
    #[must_use]
    pub const fn target(&self) -> PublishTarget {
        self.target
    }

    /// Publish one message.
    ///
    /// In primary mode this waits for the `ACK` and fails over on any miss;
    /// in backup mode it is fire-and-forget.
    ///
    /// # Errors
    /// Returns an error only if the topic or payload is not expressible on
    /// the wire; transport failures are absorbed by the failover state
    /// machine.
    pub async fn publish(&mut self, topic: &str, payload: &str) -> Result<Delivery> {
        let frame = Frame::publish(topic, payload)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.window.push(seq, frame.clone());

        match self.target {
            PublishTarget::Primary => {
                if self.send_with_ack(&frame).await {
                    debug!(seq, topic, "acknowledged by primary");
                    Ok(Delivery::Acknowledged)
                } else {
                    warn!(seq, topic, "primary missed the acknowledgement, failing over");
                    self.target = PublishTarget::Backup;
                    self.replay_window().await;
                    Ok(Delivery::FailedOver)
                }
            },
            PublishTarget::Backup => {
                self.send_fire_and_forget(&frame).await;
                Ok(Delivery::SentToBackup)
            },
        }
    }

    /// One connect-send-await-ACK round trip against the primary.
    async fn send_with_ack(&self, frame: &Frame) -> bool {
        let mut stream = match TcpStream::connect(&self.config.primary_addr).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(addr = %self.config.primary_addr, error = %e, "primary dial failed");
                return false;
            },
        };

        if let Err(e) = stream.write_all(frame.to_wire().as_bytes()).await {
            warn!(error = %e, "publish write failed");
            return false;
        }

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        match timeout(self.config.ack_timeout, reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => line.trim() == "ACK",
            _ => false,
        }
    }

    /// Connect to the backup and send without waiting for a reply.
    async fn send_fire_and_forget(&self, frame: &Frame) {
        match TcpStream::connect(&self.config.backup_addr).await {
            Ok(mut stream) => {
                if let Err(e) = stream.write_all(frame.to_wire().as_bytes()).await {
                    warn!(error = %e, "backup write failed");
                } else {
                    debug!(topic = frame.topic(), "sent to backup");
                }
            },
            Err(e) => {
                warn!(addr = %self.config.backup_addr, error = %e, "backup dial failed");
            },
        }
    }

    /// Replay the window to the backup, oldest first, with a pacing gap.
    ///
    /// Messages the primary replicated before dying are already buffered on
    /// the backup and these re-sends are dropped there; messages the primary
    /// never saw are delivered after takeover. Either way nothing in the
    /// window is lost.
    async fn replay_window(&self) {
        info!(entries = self.window.len(), "replaying window to backup");
        for entry in self.window.iter() {
            self.send_fire_and_forget(&entry.frame).await;
            sleep(self.config.replay_gap).await;
        }
    }
}

//! Liveness probing of the primary and the takeover latch.
//!
//! The backup dials the primary once per second and exchanges a `PING` /
//! `PONG` pair over a fresh connection. The first failed probe arms the
//! takeover exactly once per process lifetime; recovery of the primary is
//! reported and the latch returns to alive, but the takeover is never
//! re-armed.

use crate::broker::{Core, Role};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Interval between probes.
const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Deadline for establishing the probe connection.
const DIAL_TIMEOUT: Duration = Duration::from_millis(300);

/// Deadline for writing the probe request.
const WRITE_TIMEOUT: Duration = Duration::from_millis(200);

/// Deadline for reading the probe reply.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct LatchState {
    alive: bool,
    takeover_fired: bool,
}

/// Latched view of the primary's liveness, as observed by the prober.
///
/// Starts alive. The first alive→down transition arms the takeover; every
/// later transition in either direction only updates the reported state.
#[derive(Debug)]
pub struct PrimaryLatch {
    state: Mutex<LatchState>,
}

impl PrimaryLatch {
    /// Create a latch that believes the primary is alive.
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(LatchState { alive: true, takeover_fired: false }) }
    }

    /// Whether the last probe saw the primary alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    /// Record a failed probe.
    ///
    /// Returns `true` exactly once per process lifetime: on the transition
    /// that arms the takeover.
    pub fn mark_down(&self) -> bool {
        let mut state = self.state.lock();
        state.alive = false;
        if state.takeover_fired {
            return false;
        }
        state.takeover_fired = true;
        true
    }

    /// Record a successful probe.
    ///
    /// Returns `true` if this probe observed a recovery (the latch was down).
    pub fn mark_alive(&self) -> bool {
        let mut state = self.state.lock();
        let recovered = !state.alive;
        state.alive = true;
        recovered
    }
}

impl Default for PrimaryLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe the primary once a second; arm the takeover on the first loss.
pub(crate) async fn run_prober(core: Arc<Core>, primary_addr: String) {
    let Role::Backup { latch, .. } = core.role() else {
        return;
    };

    let mut ticker = interval(PROBE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so probing starts one
    // interval after startup.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if probe_once(&primary_addr).await {
            if latch.mark_alive() {
                info!(addr = %primary_addr, "primary is back online");
            }
        } else if latch.mark_down() {
            warn!(addr = %primary_addr, "primary is down, taking over");
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.take_over().await });
        } else {
            debug!(addr = %primary_addr, "probe failed");
        }
    }
}

/// One probe round trip: dial, `PING||`, expect `PONG`.
async fn probe_once(addr: &str) -> bool {
    let mut stream = match timeout(DIAL_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        _ => return false,
    };

    if !matches!(timeout(WRITE_TIMEOUT, stream.write_all(b"PING||\n")).await, Ok(Ok(()))) {
        return false;
    }

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    match timeout(READ_TIMEOUT, reader.read_line(&mut line)).await {
        Ok(Ok(n)) if n > 0 => line.trim() == "PONG",
        _ => false,
    }
}

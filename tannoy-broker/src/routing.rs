//! Topic routing table.
//!
//! Maps each topic to the ordered list of subscriber connections attached to
//! it. All operations run under one exclusive lock, and the lock is never
//! held across I/O: fan-out takes a [`snapshot`](RoutingTable::snapshot) and
//! writes to subscribers lock-free.

use crate::network::{ClientConnection, ConnectionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Topic → subscriber bindings, insertion-ordered per topic.
///
/// Attaching is append-only with no deduplication: a connection that
/// subscribes to the same topic twice is visited twice by fan-out. A topic
/// exists while at least one binding references it.
#[derive(Debug, Default)]
pub struct RoutingTable {
    topics: Mutex<HashMap<String, Vec<Arc<ClientConnection>>>>,
}

impl RoutingTable {
    /// Create an empty routing table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `conn` to the topic's subscriber list.
    pub fn attach(&self, topic: &str, conn: Arc<ClientConnection>) {
        let mut topics = self.topics.lock();
        topics.entry(topic.to_string()).or_default().push(conn);
    }

    /// Return a stable copy of the topic's subscriber list for lock-free
    /// fan-out.
    #[must_use]
    pub fn snapshot(&self, topic: &str) -> Vec<Arc<ClientConnection>> {
        let topics = self.topics.lock();
        topics.get(topic).cloned().unwrap_or_default()
    }

    /// Remove every binding of `conn`, across all topics.
    ///
    /// Returns the number of bindings removed. Topics left without bindings
    /// are dropped from the table.
    pub fn detach(&self, conn: ConnectionId) -> usize {
        let mut topics = self.topics.lock();
        let mut removed = 0;
        topics.retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|subscriber| subscriber.id() != conn);
            removed += before - subscribers.len();
            !subscribers.is_empty()
        });
        removed
    }

    /// Number of topics with at least one binding.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.lock().len()
    }
}

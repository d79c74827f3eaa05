//! Network handling for inbound client connections.
//!
//! ## Key components
//! - [`ClientConnection`] — shared write-side handle for one accepted socket
//! - [`ConnectionManager`] — registry of connections owned by the multiplexer
//! - [`listener`] — accept loop and per-connection frame readers
//!
//! Ownership is split deliberately: subscriber connections are long-lived and
//! belong to the multiplexer, while a publisher connection is handed to the
//! broker core together with its `PUBLISH` frame so the core can close it
//! after fan-out. A connection is therefore never closed twice.

pub mod connection;
pub mod listener;

pub use connection::{ClientConnection, ConnectionId, ConnectionManager};
pub use listener::Inbound;

pub(crate) use listener::run_accept_loop;

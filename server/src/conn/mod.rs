//! Connection bookkeeping: the connection table, the nickname registry,
//! and the capability handle command handlers borrow to reach them.
//!
//! The two tables are keyed by a fresh 128-bit id per accepted socket and
//! are kept in lockstep: an id is present in the connection table if and
//! only if it is present in the nickname registry. All mutation goes
//! through [`ServerHandle`]; nothing here holds a lock across an await.

pub mod actor;
pub mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::ws::frame;

/// Nickname reported for ids the registry does not know.
pub const DEFAULT_NICK: &str = "Anonymous";

/// Wire protocol of a connection, fixed by first-read classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Plain,
    WebSocket,
}

/// Messages consumed by a connection's writer task.
#[derive(Debug)]
pub enum Outbound {
    /// Pre-encoded bytes to put on the wire.
    Data(Vec<u8>),
    /// Flush whatever was queued before this marker, then close the
    /// transport. Enqueued by `disconnect` so a QUIT reply is never cut
    /// off.
    Shutdown,
}

pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Per-connection entry in the connection table.
pub struct Connection {
    tx: OutboundSender,
    protocol: Protocol,
    last_active: Instant,
    cancel: CancellationToken,
}

/// Capability handed to command handlers and the per-connection actors.
///
/// Cloning is cheap; the tables themselves live behind `Arc` and are owned
/// by the server state, not by any global.
#[derive(Clone)]
pub struct ServerHandle {
    connections: Arc<DashMap<Uuid, Connection>>,
    users: Arc<DashMap<Uuid, String>>,
}

impl ServerHandle {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            users: Arc::new(DashMap::new()),
        }
    }

    /// Register a freshly accepted connection and return its id.
    ///
    /// The entry starts on the plain protocol; [`mark_websocket`] flips it
    /// at most once, during first-read classification. The nickname entry
    /// is inserted first so the connection table never references an id
    /// the registry does not know.
    pub fn register(&self, tx: OutboundSender, cancel: CancellationToken) -> Uuid {
        let id = Uuid::now_v7();
        self.users.insert(id, DEFAULT_NICK.to_string());
        self.connections.insert(
            id,
            Connection {
                tx,
                protocol: Protocol::Plain,
                last_active: Instant::now(),
                cancel,
            },
        );
        id
    }

    /// Fix the connection's protocol as WebSocket after a successful
    /// handshake.
    pub fn mark_websocket(&self, id: Uuid) {
        if let Some(mut conn) = self.connections.get_mut(&id) {
            conn.protocol = Protocol::WebSocket;
        }
    }

    /// Refresh `last_active` after a successful inbound read.
    pub fn touch(&self, id: Uuid) {
        if let Some(mut conn) = self.connections.get_mut(&id) {
            conn.last_active = Instant::now();
        }
    }

    /// Queue `text` (newline-terminated, encoded per the connection's
    /// protocol) for delivery. Unknown ids are a silent no-op.
    pub fn send(&self, id: Uuid, text: &str) {
        let Some(conn) = self.connections.get(&id) else {
            tracing::debug!(conn_id = %id, "send to vanished connection dropped");
            return;
        };
        let line = format!("{text}\n");
        let bytes = match conn.protocol {
            Protocol::Plain => line.into_bytes(),
            Protocol::WebSocket => frame::encode_text(&line),
        };
        let _ = conn.tx.send(Outbound::Data(bytes));
    }

    /// Fan `text` out to a snapshot of the currently live connections,
    /// the sender included.
    pub fn broadcast(&self, text: &str) {
        let ids: Vec<Uuid> = self.connections.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.send(id, text);
        }
    }

    /// Tear a connection down: drop it from both tables, let the writer
    /// drain its queue, and wake a reader parked in `read()`. Idempotent.
    pub fn disconnect(&self, id: Uuid) {
        if let Some((_, conn)) = self.connections.remove(&id) {
            self.users.remove(&id);
            let _ = conn.tx.send(Outbound::Shutdown);
            conn.cancel.cancel();
        }
    }

    pub fn is_connected(&self, id: Uuid) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Record a nickname for `id`. No length or charset validation.
    pub fn set_nick(&self, id: Uuid, nick: &str) {
        self.users.insert(id, nick.to_string());
    }

    /// Nickname for `id`, or [`DEFAULT_NICK`] for unknown ids.
    pub fn get_nick(&self, id: Uuid) -> String {
        self.users
            .get(&id)
            .map(|nick| nick.value().clone())
            .unwrap_or_else(|| DEFAULT_NICK.to_string())
    }

    /// Ids whose last inbound activity is strictly older than `ttl`.
    pub fn idle_ids(&self, ttl: Duration) -> Vec<Uuid> {
        let now = Instant::now();
        self.connections
            .iter()
            .filter(|entry| now.duration_since(entry.last_active) > ttl)
            .map(|entry| *entry.key())
            .collect()
    }
}

impl Default for ServerHandle {
    fn default() -> Self {
        Self::new()
    }
}

//! Broadcast Hub
//!
//! Connection registry with non-blocking fan-out. Every connection gets a
//! bounded outbound buffer; a full buffer marks the consumer as too slow and
//! the hub evicts it so the rest keep receiving in real time.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthPrincipal;
use crate::metrics::names;
use crate::services::matching::{MarketDepth, Trade};

/// Outbound frames buffered per connection before it is considered slow.
pub const OUTBOUND_BUFFER: usize = 64;

/// Server -> client events. The wire shape is `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected { connection_id: Uuid },
    Orderbook(MarketDepth),
    Trade(Trade),
    YellowAuthSuccess { user_id: String, expires_at: i64 },
    Error { message: String },
}

struct Connection {
    sender: mpsc::Sender<String>,
    principal: RwLock<Option<AuthPrincipal>>,
}

pub struct BroadcastHub {
    connections: DashMap<Uuid, Connection>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection; the receiver feeds the connection's write task.
    pub fn register(&self) -> (Uuid, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_BUFFER);
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            Connection {
                sender,
                principal: RwLock::new(None),
            },
        );
        metrics::gauge!(names::WS_CONNECTIONS_ACTIVE).set(self.connections.len() as f64);
        debug!(connection_id = %id, "connection registered");
        (id, receiver)
    }

    pub fn unregister(&self, id: Uuid) {
        if self.connections.remove(&id).is_some() {
            metrics::gauge!(names::WS_CONNECTIONS_ACTIVE).set(self.connections.len() as f64);
            debug!(connection_id = %id, "connection unregistered");
        }
    }

    /// Record the authenticated principal on a connection.
    pub fn set_principal(&self, id: Uuid, principal: AuthPrincipal) {
        if let Some(connection) = self.connections.get(&id) {
            *connection.principal.write() = Some(principal);
        }
    }

    pub fn principal(&self, id: Uuid) -> Option<AuthPrincipal> {
        self.connections
            .get(&id)
            .and_then(|c| c.principal.read().clone())
    }

    /// Serialize once, enqueue everywhere without blocking. Connections whose
    /// buffer is full (or whose write task is gone) are evicted.
    pub fn broadcast(&self, event: &ServerEvent) {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to serialize broadcast event");
                return;
            }
        };

        let mut evicted: Vec<Uuid> = Vec::new();
        for entry in self.connections.iter() {
            if entry.sender.try_send(frame.clone()).is_err() {
                evicted.push(*entry.key());
            }
        }
        for id in evicted {
            warn!(connection_id = %id, "evicting slow consumer");
            self.unregister(id);
        }
        metrics::counter!(names::WS_MESSAGES_SENT_TOTAL).increment(self.connections.len() as u64);
    }

    /// Best-effort direct send to one connection.
    pub fn send_to(&self, id: Uuid, event: &ServerEvent) {
        let Some(connection) = self.connections.get(&id) else {
            return;
        };
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to serialize event");
                return;
            }
        };
        if connection.sender.try_send(frame).is_err() {
            drop(connection);
            warn!(connection_id = %id, "evicting slow consumer");
            self.unregister(id);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

//! WebSocket Gateway
//!
//! Per-process table of live connections and their outbound channels. The
//! table is transport plumbing only: which user owns a connection is always
//! answered by the shared store.

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::messages::ServerFrame;
use crate::domain::{Delivery, DeliveryTarget};

/// Outbound half of one live connection
struct ConnectionHandle {
    authenticated: bool,
    sender: mpsc::UnboundedSender<ServerFrame>,
}

/// WebSocket gateway managing this process's connections
pub struct Gateway {
    /// Live connections by connection id
    connections: DashMap<String, ConnectionHandle>,
    /// Heartbeat interval in milliseconds
    heartbeat_interval_ms: u64,
}

impl Gateway {
    pub fn new(heartbeat_interval_ms: u64) -> Self {
        Self {
            connections: DashMap::new(),
            heartbeat_interval_ms,
        }
    }

    /// Get the heartbeat interval
    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    /// Attach a connection's outbound channel
    pub fn attach(
        &self,
        connection_id: &str,
        authenticated: bool,
        sender: mpsc::UnboundedSender<ServerFrame>,
    ) {
        self.connections.insert(
            connection_id.to_string(),
            ConnectionHandle {
                authenticated,
                sender,
            },
        );
        tracing::debug!(connection_id = %connection_id, authenticated, "Connection attached");
    }

    /// Detach a connection
    pub fn detach(&self, connection_id: &str) {
        if self.connections.remove(connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Connection detached");
        }
    }

    /// Forward a delivery to the connections held by this process. Ids held
    /// elsewhere are skipped. Returns the number of frames queued.
    pub fn deliver(&self, delivery: Delivery) -> usize {
        let frame = ServerFrame::Push(delivery.event);

        match delivery.target {
            DeliveryTarget::All => self
                .connections
                .iter()
                .filter(|entry| entry.sender.send(frame.clone()).is_ok())
                .count(),
            DeliveryTarget::Connections(ids) => ids
                .iter()
                .filter(|id| {
                    self.connections
                        .get(id.as_str())
                        .map(|handle| handle.sender.send(frame.clone()).is_ok())
                        .unwrap_or(false)
                })
                .count(),
        }
    }

    /// Get connection count
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections bound to a user
    pub fn authenticated_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.authenticated)
            .count()
    }
}

//! WebSocket Connection State

use std::time::{Duration, Instant};

/// Liveness of one WebSocket connection. Any inbound frame counts as a
/// heartbeat.
#[derive(Debug)]
pub struct ConnectionState {
    pub connection_id: String,
    pub frames_received: u64,
    pub last_heartbeat: Instant,
}

impl ConnectionState {
    pub fn new(connection_id: String) -> Self {
        Self {
            connection_id,
            frames_received: 0,
            last_heartbeat: Instant::now(),
        }
    }

    pub fn heartbeat(&mut self) {
        self.frames_received += 1;
        self.last_heartbeat = Instant::now();
    }

    pub fn is_alive(&self, timeout: Duration) -> bool {
        self.last_heartbeat.elapsed() < timeout
    }
}

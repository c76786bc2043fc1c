//! Snowflake ID Generator
//!
//! Time-ordered 63-bit identifiers for stories.
//!
//! Layout: 41 bits of milliseconds since the configured epoch, 10 bits of
//! machine id, 12 bits of per-millisecond sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MACHINE_MASK: u64 = (1 << MACHINE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch_ms: u64,
    /// Packed `timestamp << SEQUENCE_BITS | sequence` of the last issued id
    state: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a new generator for a machine (0-1023) and epoch in Unix milliseconds
    pub fn new(machine_id: u64, epoch_ms: u64) -> Self {
        Self {
            machine_id: machine_id & MACHINE_MASK,
            epoch_ms,
            state: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let now = self.elapsed_ms();
        let mut current = self.state.load(Ordering::Acquire);

        loop {
            let last_ts = current >> SEQUENCE_BITS;
            let last_seq = current & SEQUENCE_MASK;

            // Clock going backwards or sequence exhaustion borrows from the next millisecond
            let (ts, seq) = if now > last_ts {
                (now, 0)
            } else if last_seq < SEQUENCE_MASK {
                (last_ts, last_seq + 1)
            } else {
                (last_ts + 1, 0)
            };

            let next = (ts << SEQUENCE_BITS) | seq;
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let id = (ts << (MACHINE_BITS + SEQUENCE_BITS))
                        | (self.machine_id << SEQUENCE_BITS)
                        | seq;
                    return id as i64;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Extract the Unix millisecond timestamp embedded in an id
    pub fn timestamp_of(&self, snowflake: i64) -> u64 {
        ((snowflake as u64) >> (MACHINE_BITS + SEQUENCE_BITS)) + self.epoch_ms
    }

    fn elapsed_ms(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        now.saturating_sub(self.epoch_ms)
    }
}

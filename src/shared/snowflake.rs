//! Snowflake ID Generator
//!
//! Twitter-style unique ID generation: epoch-relative millisecond
//! timestamp, machine id, and a per-millisecond sequence packed into
//! an i64. IDs are serialized as strings on the wire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generation epoch (2015-01-01T00:00:00.000Z)
const EPOCH_MS: u64 = 1420070400000;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    sequence: AtomicU64,
    last_timestamp: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a generator for the given machine id (10 bits)
    pub fn new(machine_id: u64) -> Self {
        Self {
            machine_id: machine_id & 0x3FF,
            sequence: AtomicU64::new(0),
            last_timestamp: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let timestamp = self.current_timestamp();
        let last = self.last_timestamp.load(Ordering::SeqCst);

        let sequence = if timestamp == last {
            self.sequence.fetch_add(1, Ordering::SeqCst) & 0xFFF
        } else {
            self.last_timestamp.store(timestamp, Ordering::SeqCst);
            self.sequence.store(0, Ordering::SeqCst);
            0
        };

        (((timestamp - EPOCH_MS) << 22) | (self.machine_id << 12) | sequence) as i64
    }

    /// Get current timestamp in milliseconds
    fn current_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }
}

/// Extract the creation timestamp (unix ms) from a snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> 22) + EPOCH_MS
}

/// Parse a snowflake from its wire (string) form
pub fn from_string(s: &str) -> Result<i64, std::num::ParseIntError> {
    s.parse()
}

//! Snowflake ID Generator
//!
//! Time-ordered 64-bit identifiers for every persisted record.
//!
//! Layout: 41 bits milliseconds since [`EPOCH`], 5 bits machine, 5 bits node,
//! 12 bits sequence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Service epoch (2024-01-01T00:00:00.000Z)
pub const EPOCH: u64 = 1_704_067_200_000;

const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    node_id: u64,
    /// Packed `(timestamp << 12) | sequence` of the last issued ID.
    state: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64, node_id: u64) -> Self {
        Self {
            machine_id: machine_id & 0x1F, // 5 bits
            node_id: node_id & 0x1F,       // 5 bits
            state: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let last_ts = current >> SEQUENCE_BITS;
            let now = current_timestamp().max(last_ts);

            let next = if now == last_ts {
                let seq = (current & SEQUENCE_MASK) + 1;
                if seq > SEQUENCE_MASK {
                    // Sequence exhausted for this millisecond; borrow the next one.
                    (now + 1) << SEQUENCE_BITS
                } else {
                    (now << SEQUENCE_BITS) | seq
                }
            } else {
                now << SEQUENCE_BITS
            };

            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let timestamp = next >> SEQUENCE_BITS;
                    let sequence = next & SEQUENCE_MASK;
                    let id = ((timestamp.saturating_sub(EPOCH)) << 22)
                        | (self.machine_id << 17)
                        | (self.node_id << 12)
                        | sequence;
                    return id as i64;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH)
}

/// Extract timestamp from snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> 22) + EPOCH
}

/// Parse snowflake from its string form, as sent by clients
pub fn from_string(s: &str) -> Result<i64, std::num::ParseIntError> {
    s.parse()
}

//! Snowflake ID Generator
//!
//! Monotonic ID assignment for the message log. The generator is owned by the
//! store's append path, which serializes access to it.

use chrono::{DateTime, Utc};

use crate::domain::Snowflake;

/// Snowflake ID generator
#[derive(Debug)]
pub struct SnowflakeGenerator {
    machine_id: u16,
    last: i64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u16) -> Self {
        Self {
            machine_id: machine_id & 0x3FF, // 10 bits
            last: 0,
        }
    }

    /// Continue numbering after an ID that was already handed out,
    /// e.g. the newest persisted message.
    pub fn resume_after(mut self, last: Snowflake) -> Self {
        self.last = self.last.max(last.as_i64());
        self
    }

    /// Generate the next ID for a record created at `timestamp`.
    ///
    /// IDs are strictly increasing even if the wall clock stalls, steps
    /// backwards, or more than 4096 IDs are requested in one millisecond.
    pub fn next_id(&mut self, timestamp: DateTime<Utc>) -> Snowflake {
        let millis = timestamp.timestamp_millis().max(0) as u64;
        let candidate = Snowflake::from_parts(millis, self.machine_id, 0).as_i64();
        let id = candidate.max(self.last + 1);
        self.last = id;
        Snowflake::new(id)
    }
}

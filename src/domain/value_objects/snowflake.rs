//! Snowflake message identifiers.
//!
//! Snowflake IDs are 64-bit integers with an embedded millisecond timestamp,
//! so ordering by ID is ordering by creation time.
//!
//! ## Structure
//!
//! ```text
//! 63  62                      22               12          0
//! +---+-----------------------+----------------+-----------+
//! | 0 |       timestamp       |    machine     |  sequence |
//! |   |       (41 bits)       |    (10 bits)   |  (12 bits)|
//! +---+-----------------------+----------------+-----------+
//! ```
//!
//! The sign bit is always clear, so IDs are positive `BIGINT`s.
//!
//! IDs are serialized as decimal strings: they exceed the 53-bit integer
//! range JavaScript clients can represent exactly.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Project epoch: 2024-01-01T00:00:00Z in milliseconds
pub const CHAT_EPOCH: u64 = 1704067200000;

/// A time-sortable message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub i64);

impl Snowflake {
    /// Create a new Snowflake from raw value.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Create a Snowflake from its components.
    ///
    /// Timestamps before [`CHAT_EPOCH`] saturate to the epoch; offsets past
    /// 41 bits wrap.
    pub fn from_parts(timestamp_ms: u64, machine_id: u16, sequence: u16) -> Self {
        let ts = (timestamp_ms.saturating_sub(CHAT_EPOCH) & 0x1FF_FFFF_FFFF) << 22;
        let machine = ((machine_id as u64) & 0x3FF) << 12;
        let seq = (sequence as u64) & 0xFFF;

        Self((ts | machine | seq) as i64)
    }

    /// Extract the timestamp from this Snowflake.
    pub fn timestamp(&self) -> u64 {
        ((self.0 as u64) >> 22) + CHAT_EPOCH
    }

    /// Get the raw i64 value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for Snowflake {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Snowflake> for i64 {
    fn from(snowflake: Snowflake) -> Self {
        snowflake.0
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnowflakeVisitor;

        impl<'de> Visitor<'de> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snowflake id as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Snowflake, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Snowflake, E> {
                Ok(Snowflake(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Snowflake, E> {
                i64::try_from(v).map(Snowflake).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

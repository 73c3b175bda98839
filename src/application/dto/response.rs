//! Response DTOs
//!
//! Data structures for API response bodies. Field names match the gateway
//! wire frames so clients parse both the same way.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Message, PresenceRecord, PresenceStatus, Snowflake};

/// Message response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub id: Snowflake,
    pub sender: String,
    pub text: String,
    pub ts: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender: message.sender.to_string(),
            text: message.text,
            ts: message.created_at,
        }
    }
}

/// Presence response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub identity: String,
    pub status: PresenceStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<PresenceRecord> for PresenceResponse {
    fn from(record: PresenceRecord) -> Self {
        Self {
            identity: record.identity.to_string(),
            status: record.status,
            last_seen: record.last_seen,
        }
    }
}

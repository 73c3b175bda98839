//! WebSocket Message Types
//!
//! Gateway frames are JSON objects tagged by `type`. Clients send `SEND` and
//! `HEARTBEAT`; the server answers with the frames in [`ServerFrame`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Message, PresenceRecord, PresenceStatus, Snowflake};
use crate::shared::error::ChatError;

/// Frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// Append a message to the log
    Send { text: String },
    /// Keep the sender's presence alive
    Heartbeat {},
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerFrame {
    /// First frame of every session
    Ready {
        identity: String,
        counterpart: String,
        heartbeat_interval_ms: u64,
        expiry_window_ms: u64,
    },
    Message {
        id: Snowflake,
        sender: String,
        text: String,
        ts: DateTime<Utc>,
    },
    Presence {
        identity: String,
        status: PresenceStatus,
        last_seen: Option<DateTime<Utc>>,
    },
    /// Events were dropped for this session; the server backfills messages
    /// right after this frame.
    ResyncRequired {},
    HeartbeatAck {},
    Error {
        code: String,
        message: String,
    },
}

impl ServerFrame {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerFrame::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Message> for ServerFrame {
    fn from(message: Message) -> Self {
        ServerFrame::Message {
            id: message.id,
            sender: message.sender.to_string(),
            text: message.text,
            ts: message.created_at,
        }
    }
}

impl From<PresenceRecord> for ServerFrame {
    fn from(record: PresenceRecord) -> Self {
        ServerFrame::Presence {
            identity: record.identity.to_string(),
            status: record.status,
            last_seen: record.last_seen,
        }
    }
}

impl From<&ChatError> for ServerFrame {
    fn from(err: &ChatError) -> Self {
        ServerFrame::error(err.code(), err.to_string())
    }
}

/// Error codes that only exist on the gateway.
pub mod codes {
    /// The frame was not valid JSON or not a known client frame
    pub const BAD_FRAME: &str = "BAD_FRAME";
}

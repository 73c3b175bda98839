//! Presence record entity and repository trait.
//!
//! Maps to the `presence` table, one row per participant:
//! - identity: TEXT PRIMARY KEY
//! - status: TEXT NOT NULL ('online' | 'offline')
//! - last_seen: TIMESTAMPTZ NULL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::participant::Participant;
use crate::shared::error::ChatError;

/// Online status of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    #[default]
    Offline,
}

impl PresenceStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "online" => Self::Online,
            _ => Self::Offline,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current presence of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub identity: Participant,
    pub status: PresenceStatus,
    /// Time of the last accepted heartbeat or explicit disconnect.
    /// `None` until the participant has been seen at all.
    pub last_seen: Option<DateTime<Utc>>,
}

impl PresenceRecord {
    /// Record for a participant that has never been seen.
    pub fn unknown(identity: Participant) -> Self {
        Self {
            identity,
            status: PresenceStatus::Offline,
            last_seen: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == PresenceStatus::Online
    }
}

/// Durable presence storage with upsert-by-identity semantics.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// Insert or replace the record keyed by `record.identity`.
    async fn upsert(&self, record: &PresenceRecord) -> Result<(), ChatError>;

    /// All persisted records.
    async fn find_all(&self) -> Result<Vec<PresenceRecord>, ChatError>;
}

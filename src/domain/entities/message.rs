//! Message entity and repository trait.
//!
//! Maps to the `messages` table:
//! - id: BIGINT PRIMARY KEY (Snowflake ID)
//! - sender: TEXT NOT NULL
//! - text: TEXT NOT NULL
//! - created_at: TIMESTAMPTZ NOT NULL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::participant::Participant;
use crate::domain::Snowflake;
use crate::shared::error::ChatError;

/// A stored chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key), strictly increasing in append order
    pub id: Snowflake,

    /// Participant who sent the message
    pub sender: Participant,

    /// Message body, stored exactly as submitted
    pub text: String,

    /// Server-assigned creation time, millisecond precision
    pub created_at: DateTime<Utc>,
}

/// Durable message log access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message. Must be durable when this returns `Ok`.
    async fn insert(&self, message: &Message) -> Result<(), ChatError>;

    /// Messages with an ID strictly greater than `cursor`, oldest first.
    /// `None` returns the full history.
    async fn list_after(&self, cursor: Option<Snowflake>) -> Result<Vec<Message>, ChatError>;

    /// The newest persisted message, if any.
    async fn latest(&self) -> Result<Option<Message>, ChatError>;
}

//! Message Store
//!
//! Append-only message log on top of a [`MessageRepository`]. The append
//! path is single-writer: ID and timestamp assignment, the durable insert
//! and the hub publication all happen under one lock, so the order in which
//! messages are persisted is the order every subscriber observes.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::Mutex;
use tracing::instrument;

use super::fanout_hub::{FanoutHub, HubEvent};
use crate::domain::{Message, MessageRepository, Participant, Participants, Snowflake};
use crate::infrastructure::metrics::{APPEND_FAILURES_TOTAL, MESSAGES_APPENDED_TOTAL};
use crate::shared::error::ChatError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::validation::MAX_MESSAGE_LENGTH;

/// Position of the log tail, owned by the append path.
struct AppendTail {
    ids: SnowflakeGenerator,
    last_created_at: Option<DateTime<Utc>>,
}

pub struct MessageStore {
    repo: Arc<dyn MessageRepository>,
    hub: Arc<FanoutHub>,
    participants: Participants,
    tail: Mutex<AppendTail>,
}

impl MessageStore {
    /// Open the store, resuming ID and timestamp assignment after the newest
    /// persisted message.
    pub async fn open(
        repo: Arc<dyn MessageRepository>,
        hub: Arc<FanoutHub>,
        participants: Participants,
        machine_id: u16,
    ) -> Result<Self, ChatError> {
        let latest = repo.latest().await?;

        let mut ids = SnowflakeGenerator::new(machine_id);
        if let Some(message) = &latest {
            ids = ids.resume_after(message.id);
        }

        tracing::info!(
            last_id = latest.as_ref().map(|m| m.id.as_i64()),
            "Message store opened"
        );

        Ok(Self {
            repo,
            hub,
            participants,
            tail: Mutex::new(AppendTail {
                ids,
                last_created_at: latest.map(|m| m.created_at),
            }),
        })
    }

    /// Append a message from `sender`.
    ///
    /// Text is stored verbatim; it only has to contain something besides
    /// whitespace. Nothing is persisted or published when validation fails.
    #[instrument(skip(self, sender, text), fields(sender = %sender, len = text.len()))]
    pub async fn append(&self, sender: &Participant, text: &str) -> Result<Message, ChatError> {
        if !self.participants.contains(sender) {
            return Err(ChatError::UnknownParticipant(sender.to_string()));
        }
        validate_text(text)?;

        let mut tail = self.tail.lock().await;

        // Millisecond precision survives every backend unchanged.
        let now = Utc::now().trunc_subsecs(3);
        let created_at = match tail.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };

        let id = tail.ids.next_id(created_at);

        let message = Message {
            id,
            sender: sender.clone(),
            text: text.to_string(),
            created_at,
        };

        if let Err(e) = self.repo.insert(&message).await {
            APPEND_FAILURES_TOTAL.inc();
            tracing::warn!(error = %e, "Message append failed");
            return Err(e);
        }

        tail.last_created_at = Some(created_at);
        MESSAGES_APPENDED_TOTAL.inc();

        let seq = self.hub.publish(HubEvent::Message(message.clone()));
        tracing::debug!(id = %message.id, seq, "Message appended");

        Ok(message)
    }

    /// Every message with an ID strictly after `cursor`, oldest first.
    /// `None` returns the full history.
    pub async fn list_since(&self, cursor: Option<Snowflake>) -> Result<Vec<Message>, ChatError> {
        self.repo.list_after(cursor).await
    }
}

fn validate_text(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::Validation("message text must not be empty".into()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::Validation(format!(
            "message text must be at most {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

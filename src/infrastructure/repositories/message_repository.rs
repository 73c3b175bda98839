//! Message Repository Implementations
//!
//! PostgreSQL and SQLite implementations of the append-only message log.
//! Rows are only ever inserted; history is read in ID order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, SqlitePool};

use crate::domain::{Message, MessageRepository, Participant, Snowflake};
use crate::shared::error::ChatError;

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    sender: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    fn into_message(self) -> Message {
        Message {
            id: Snowflake::new(self.id),
            sender: Participant::from_stored(self.sender),
            text: self.text,
            created_at: self.created_at,
        }
    }
}

/// Cursor value matching every stored ID.
fn cursor_value(cursor: Option<Snowflake>) -> i64 {
    cursor.map(|c| c.as_i64()).unwrap_or(i64::MIN)
}

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: &Message) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender, text, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(message.id.as_i64())
        .bind(message.sender.as_str())
        .bind(&message.text)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_after(&self, cursor: Option<Snowflake>) -> Result<Vec<Message>, ChatError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender, text, created_at
            FROM messages
            WHERE id > $1
            ORDER BY id ASC
            "#,
        )
        .bind(cursor_value(cursor))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn latest(&self) -> Result<Option<Message>, ChatError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender, text, created_at
            FROM messages
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MessageRow::into_message))
    }
}

/// SQLite message repository implementation.
pub struct SqliteMessageRepository {
    pool: SqlitePool,
}

impl SqliteMessageRepository {
    /// Creates a new SqliteMessageRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn insert(&self, message: &Message) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender, text, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(message.id.as_i64())
        .bind(message.sender.as_str())
        .bind(&message.text)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_after(&self, cursor: Option<Snowflake>) -> Result<Vec<Message>, ChatError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender, text, created_at
            FROM messages
            WHERE id > ?1
            ORDER BY id ASC
            "#,
        )
        .bind(cursor_value(cursor))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn latest(&self) -> Result<Option<Message>, ChatError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender, text, created_at
            FROM messages
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MessageRow::into_message))
    }
}

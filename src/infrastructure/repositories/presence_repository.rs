//! Presence Repository Implementations
//!
//! One row per participant, written with upsert semantics so that a
//! participant never has more than one record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, SqlitePool};

use crate::domain::{Participant, PresenceRecord, PresenceRepository, PresenceStatus};
use crate::shared::error::ChatError;

#[derive(Debug, sqlx::FromRow)]
struct PresenceRow {
    identity: String,
    status: String,
    last_seen: Option<DateTime<Utc>>,
}

impl PresenceRow {
    fn into_record(self) -> PresenceRecord {
        PresenceRecord {
            identity: Participant::from_stored(self.identity),
            status: PresenceStatus::from_str(&self.status),
            last_seen: self.last_seen,
        }
    }
}

/// PostgreSQL presence repository implementation.
pub struct PgPresenceRepository {
    pool: PgPool,
}

impl PgPresenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceRepository for PgPresenceRepository {
    async fn upsert(&self, record: &PresenceRecord) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            INSERT INTO presence (identity, status, last_seen)
            VALUES ($1, $2, $3)
            ON CONFLICT (identity)
            DO UPDATE SET status = EXCLUDED.status, last_seen = EXCLUDED.last_seen
            "#,
        )
        .bind(record.identity.as_str())
        .bind(record.status.as_str())
        .bind(record.last_seen)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<PresenceRecord>, ChatError> {
        let rows = sqlx::query_as::<_, PresenceRow>(
            "SELECT identity, status, last_seen FROM presence ORDER BY identity",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PresenceRow::into_record).collect())
    }
}

/// SQLite presence repository implementation.
pub struct SqlitePresenceRepository {
    pool: SqlitePool,
}

impl SqlitePresenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceRepository for SqlitePresenceRepository {
    async fn upsert(&self, record: &PresenceRecord) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            INSERT INTO presence (identity, status, last_seen)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (identity)
            DO UPDATE SET status = excluded.status, last_seen = excluded.last_seen
            "#,
        )
        .bind(record.identity.as_str())
        .bind(record.status.as_str())
        .bind(record.last_seen)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<PresenceRecord>, ChatError> {
        let rows = sqlx::query_as::<_, PresenceRow>(
            "SELECT identity, status, last_seen FROM presence ORDER BY identity",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PresenceRow::into_record).collect())
    }
}

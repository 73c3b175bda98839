//! Database Module
//!
//! Connection pools for the two supported backends and schema migrations.
//! PostgreSQL is the production backend; SQLite serves single-host
//! deployments and tests.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{PgPool, SqlitePool};
use tracing::{info, instrument};

use crate::config::DatabaseSettings;
use crate::domain::{MessageRepository, PresenceRepository};
use crate::infrastructure::repositories::{
    PgMessageRepository, PgPresenceRepository, SqliteMessageRepository,
    SqlitePresenceRepository,
};

/// A connected storage backend.
#[derive(Debug, Clone)]
pub enum Database {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl Database {
    /// Connect to the backend selected by `settings.url`.
    #[instrument(skip(settings), fields(sqlite = settings.is_sqlite()))]
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        if settings.is_sqlite() {
            create_sqlite_pool(settings).await.map(Database::Sqlite)
        } else {
            create_pg_pool(settings).await.map(Database::Postgres)
        }
    }

    /// Run the migrations for this backend.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        match self {
            Database::Postgres(pool) => sqlx::migrate!("./migrations/postgres").run(pool).await,
            Database::Sqlite(pool) => sqlx::migrate!("./migrations/sqlite").run(pool).await,
        }
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        match self {
            Database::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Database::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        }
    }

    pub fn message_repository(&self) -> Arc<dyn MessageRepository> {
        match self {
            Database::Postgres(pool) => Arc::new(PgMessageRepository::new(pool.clone())),
            Database::Sqlite(pool) => Arc::new(SqliteMessageRepository::new(pool.clone())),
        }
    }

    pub fn presence_repository(&self) -> Arc<dyn PresenceRepository> {
        match self {
            Database::Postgres(pool) => Arc::new(PgPresenceRepository::new(pool.clone())),
            Database::Sqlite(pool) => Arc::new(SqlitePresenceRepository::new(pool.clone())),
        }
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        match self {
            Database::Postgres(pool) => pool.close().await,
            Database::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Create a PostgreSQL connection pool
pub async fn create_pg_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await
}

/// Create a SQLite connection pool.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never recycled.
pub async fn create_sqlite_pool(settings: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = settings.url.contains(":memory:") || settings.url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(&settings.url)?
        .create_if_missing(true)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
    };

    let pool = pool_options
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect_with(options)
        .await?;

    info!(in_memory, "SQLite pool created");
    Ok(pool)
}

//! Repository Implementations
//!
//! PostgreSQL and SQLite implementations of the domain repository traits.
//!
//! - **MessageRepository** - append-only message log with cursor reads
//! - **PresenceRepository** - one upserted presence row per participant
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use chat_presence::infrastructure::database::Database;
//!
//! let db = Database::connect(&settings.database).await?;
//! db.run_migrations().await?;
//! let messages = db.message_repository();
//! let presence = db.presence_repository();
//! ```

pub mod message_repository;
pub mod presence_repository;

pub use message_repository::{PgMessageRepository, SqliteMessageRepository};
pub use presence_repository::{PgPresenceRepository, SqlitePresenceRepository};

//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL or SQLite)
    pub database: DatabaseSettings,

    /// Chat participants
    pub chat: ChatSettings,

    /// Heartbeat and expiry timing
    pub presence: PresenceSettings,

    /// Fan-out hub buffering
    pub hub: HubSettings,

    /// Message store retry policy
    pub store: StoreSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket configuration
    pub websocket: WebSocketSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// Database configuration.
///
/// URLs starting with `sqlite:` select the embedded SQLite backend,
/// anything else is treated as a PostgreSQL URL.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// The two chat participants.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    /// Exactly two distinct identities
    pub participants: Vec<String>,
}

/// Presence timing.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceSettings {
    /// Interval clients are told to heartbeat at (default: 15000)
    pub heartbeat_interval_ms: u64,

    /// Silence after which a participant is marked offline and its
    /// gateway session closed (default: 45000)
    pub expiry_window_ms: u64,
}

/// Fan-out hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    /// Events buffered per subscriber before it must resync
    pub buffer_capacity: usize,
}

/// Message store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Additional attempts for a send that hit an unavailable store
    pub append_retries: u32,

    /// Backoff step between attempts in milliseconds
    pub retry_backoff_ms: u64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-1023)
    pub machine_id: u16,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum frame size in bytes (default: 16KB)
    pub max_frame_size: usize,

    /// Outbound frames queued per connection before the session waits
    pub outbound_buffer: usize,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the loaded values are inconsistent (see [`Settings::validate`]).
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Self::builder(&environment)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("chat.participants")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    /// Settings built from defaults only, ignoring files and environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder("test")?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://chat.db")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("chat.participants", vec!["You", "Friend"])?
            .set_default("presence.heartbeat_interval_ms", 15000_i64)?
            .set_default("presence.expiry_window_ms", 45000_i64)?
            .set_default("hub.buffer_capacity", 256_i64)?
            .set_default("store.append_retries", 3)?
            .set_default("store.retry_backoff_ms", 200_i64)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("websocket.max_message_size", 65536_i64)? // 64KB
            .set_default("websocket.max_frame_size", 16384_i64)? // 16KB
            .set_default("websocket.outbound_buffer", 64_i64)
    }

    /// Reject combinations that would break presence or fan-out invariants.
    pub fn validate(self) -> Result<Self, ConfigError> {
        crate::domain::Participants::new(&self.chat.participants)
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        if self.presence.expiry_window_ms <= self.presence.heartbeat_interval_ms {
            return Err(ConfigError::Message(format!(
                "presence.expiry_window_ms ({}) must exceed presence.heartbeat_interval_ms ({})",
                self.presence.expiry_window_ms, self.presence.heartbeat_interval_ms
            )));
        }

        if self.hub.buffer_capacity == 0 || self.websocket.outbound_buffer == 0 {
            return Err(ConfigError::Message(
                "hub.buffer_capacity and websocket.outbound_buffer must be positive".into(),
            ));
        }

        Ok(self)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl PresenceSettings {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn expiry_window(&self) -> Duration {
        Duration::from_millis(self.expiry_window_ms)
    }
}

impl StoreSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl DatabaseSettings {
    /// Whether the URL selects the embedded SQLite backend.
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::{FanoutHub, MessageStore, PresenceTracker};
use crate::config::Settings;
use crate::domain::Participants;
use crate::infrastructure::database::Database;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::SessionContext;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: Arc<MessageStore>,
    pub tracker: PresenceTracker,
    pub hub: Arc<FanoutHub>,
    pub participants: Participants,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Connect storage, run migrations and open the chat core.
    pub async fn build(settings: Settings) -> Result<Self> {
        let participants = Participants::new(&settings.chat.participants)?;

        let db = Database::connect(&settings.database).await?;
        tracing::info!(sqlite = settings.database.is_sqlite(), "Database connection pool created");

        db.run_migrations().await?;
        tracing::info!("Database migrations applied");

        let hub = Arc::new(FanoutHub::new(settings.hub.buffer_capacity));

        let store = Arc::new(
            MessageStore::open(
                db.message_repository(),
                hub.clone(),
                participants.clone(),
                settings.snowflake.machine_id,
            )
            .await?,
        );

        let tracker = PresenceTracker::open(
            db.presence_repository(),
            hub.clone(),
            participants.clone(),
            settings.presence.expiry_window(),
        )
        .await?;

        Ok(Self {
            db,
            store,
            tracker,
            hub,
            participants,
            settings: Arc::new(settings),
        })
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            store: self.store.clone(),
            tracker: self.tracker.clone(),
            hub: self.hub.clone(),
            participants: self.participants.clone(),
            heartbeat_interval: self.settings.presence.heartbeat_interval(),
            expiry_window: self.settings.presence.expiry_window(),
            append_retries: self.settings.store.append_retries,
            retry_backoff: self.settings.store.retry_backoff(),
        }
    }
}

/// Router with every route and middleware layer applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let addr = settings.server_addr();
        let state = AppState::build(settings).await?;
        let router = build_router(state.clone());

        // Bind to address
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server until a shutdown signal arrives, then mark every
    /// participant offline and close the pool.
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped, disconnecting participants");
        self.state.tracker.disconnect_all().await;
        self.state.db.close().await;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

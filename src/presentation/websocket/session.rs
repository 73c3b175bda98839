//! WebSocket Session Management
//!
//! A [`Session`] drives one gateway connection: it replays history, forwards
//! hub events, serves client frames and enforces the idle timeout. It only
//! sees a stream of parsed [`ClientFrame`]s and a channel of outgoing
//! [`ServerFrame`]s, so the socket handling lives in the handler.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};
use uuid::Uuid;

use super::messages::{codes, ClientFrame, ServerFrame};
use crate::application::services::{
    Delivery, FanoutHub, HubEvent, MessageStore, PresenceTracker, Subscription,
};
use crate::domain::{Message, Participant, Participants, Snowflake};
use crate::infrastructure::metrics::GATEWAY_SESSIONS_ACTIVE;

/// Inbound item: a parsed frame, or the reason a frame could not be parsed.
pub type InboundFrame = Result<ClientFrame, String>;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed the connection
    ClientClosed,
    /// No heartbeat within the expiry window
    IdleTimeout,
    /// The connection can no longer be written to
    OutboundClosed,
    /// The store was unreachable while replaying history
    StorageUnavailable,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::ClientClosed => "client_closed",
            CloseReason::IdleTimeout => "idle_timeout",
            CloseReason::OutboundClosed => "outbound_closed",
            CloseReason::StorageUnavailable => "storage_unavailable",
        }
    }
}

/// Everything a session needs from the application.
#[derive(Clone)]
pub struct SessionContext {
    pub store: Arc<MessageStore>,
    pub tracker: PresenceTracker,
    pub hub: Arc<FanoutHub>,
    pub participants: Participants,
    pub heartbeat_interval: Duration,
    pub expiry_window: Duration,
    pub append_retries: u32,
    pub retry_backoff: Duration,
}

/// WebSocket session state
#[derive(Debug)]
pub struct SessionState {
    pub session_id: String,
    pub identity: Participant,
    pub last_heartbeat: Instant,
    /// Newest message delivered on this session
    pub last_message_id: Option<Snowflake>,
}

impl SessionState {
    pub fn new(identity: Participant) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            identity,
            last_heartbeat: Instant::now(),
            last_message_id: None,
        }
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    pub fn idle_deadline(&self, expiry_window: Duration) -> Instant {
        self.last_heartbeat + expiry_window
    }

    /// Record `id` as delivered. Returns false for a message this session
    /// has already delivered.
    pub fn advance(&mut self, id: Snowflake) -> bool {
        match self.last_message_id {
            Some(last) if id <= last => false,
            _ => {
                self.last_message_id = Some(id);
                true
            }
        }
    }
}

pub struct Session {
    ctx: SessionContext,
    state: SessionState,
    outbound: mpsc::Sender<ServerFrame>,
}

impl Session {
    pub fn new(
        ctx: SessionContext,
        identity: Participant,
        outbound: mpsc::Sender<ServerFrame>,
    ) -> Self {
        Self {
            ctx,
            state: SessionState::new(identity),
            outbound,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    /// Run the session until the client leaves, goes idle or cannot be
    /// written to. Dropping the outbound sender on return lets the writer
    /// flush and close the connection.
    pub async fn run<S>(mut self, inbound: S) -> CloseReason
    where
        S: Stream<Item = InboundFrame> + Unpin,
    {
        // Subscribe before reading history so nothing published in between
        // is lost; duplicates are filtered by message ID.
        let mut subscription = self.ctx.hub.subscribe(self.state.identity.clone());
        GATEWAY_SESSIONS_ACTIVE.inc();
        tracing::info!(
            session_id = %self.state.session_id,
            identity = %self.state.identity,
            "Gateway session opened"
        );

        let reason = match self.drive(&mut subscription, inbound).await {
            Ok(()) => CloseReason::ClientClosed,
            Err(reason) => reason,
        };

        drop(subscription);
        GATEWAY_SESSIONS_ACTIVE.dec();

        // An idle session is left to the tracker's own expiry, which keeps
        // last_seen at the final heartbeat instead of the close time.
        let identity = &self.state.identity;
        if reason != CloseReason::IdleTimeout {
            let hub = &self.ctx.hub;
            let disconnected = self
                .ctx
                .tracker
                .disconnect_unless(identity, || hub.subscriptions_for(identity) > 0)
                .await;
            if let Err(e) = disconnected {
                tracing::warn!(identity = %identity, error = %e, "Failed to record disconnect");
            }
        }

        tracing::info!(
            session_id = %self.state.session_id,
            identity = %identity,
            reason = reason.as_str(),
            "Gateway session closed"
        );
        reason
    }

    async fn drive<S>(
        &mut self,
        subscription: &mut Subscription,
        mut inbound: S,
    ) -> Result<(), CloseReason>
    where
        S: Stream<Item = InboundFrame> + Unpin,
    {
        let identity = self.state.identity.clone();
        let counterpart = self.ctx.participants.counterpart(&identity);

        // Connecting counts as a heartbeat.
        if let Err(e) = self.ctx.tracker.heartbeat(&identity).await {
            tracing::warn!(identity = %identity, error = %e, "Connect heartbeat rejected");
        }

        self.send(ServerFrame::Ready {
            identity: identity.to_string(),
            counterpart: counterpart.to_string(),
            heartbeat_interval_ms: self.ctx.heartbeat_interval.as_millis() as u64,
            expiry_window_ms: self.ctx.expiry_window.as_millis() as u64,
        })
        .await?;

        let history = match self.ctx.store.list_since(None).await {
            Ok(history) => history,
            Err(e) => {
                tracing::error!(identity = %identity, error = %e, "Failed to load history");
                self.send(ServerFrame::from(&e)).await?;
                return Err(CloseReason::StorageUnavailable);
            }
        };
        tracing::debug!(identity = %identity, count = history.len(), "Replaying history");
        self.deliver_messages(history).await?;

        self.send(self.ctx.tracker.get(&counterpart).into()).await?;

        let idle = sleep_until(self.idle_deadline());
        tokio::pin!(idle);

        loop {
            tokio::select! {
                frame = inbound.next() => match frame {
                    Some(Ok(ClientFrame::Send { text })) => self.handle_send(&text).await?,
                    Some(Ok(ClientFrame::Heartbeat {})) => {
                        self.handle_heartbeat().await?;
                        idle.as_mut().reset(self.idle_deadline());
                    }
                    Some(Err(reason)) => {
                        tracing::debug!(identity = %identity, reason = %reason, "Malformed frame");
                        self.send(ServerFrame::error(codes::BAD_FRAME, reason)).await?;
                    }
                    None => return Ok(()),
                },
                delivery = subscription.recv() => match delivery {
                    Some(Delivery::Event(envelope)) => self.forward(&envelope.event).await?,
                    Some(Delivery::Resync { missed }) => self.resync(missed).await?,
                    // The hub outlives every session; treat its end like a
                    // closed connection.
                    None => return Err(CloseReason::OutboundClosed),
                },
                _ = &mut idle => {
                    tracing::debug!(identity = %identity, "Session idle past expiry window");
                    return Err(CloseReason::IdleTimeout);
                }
            }
        }
    }

    /// Append with bounded retries while the store is unavailable. The
    /// stored message reaches this session through the hub like any other.
    async fn handle_send(&mut self, text: &str) -> Result<(), CloseReason> {
        let mut attempt = 0;
        loop {
            match self.ctx.store.append(&self.state.identity, text).await {
                Ok(message) => {
                    tracing::debug!(id = %message.id, "Message sent");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.ctx.append_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "Append failed, retrying");
                    timeout_at(self.idle_deadline(), sleep(self.ctx.retry_backoff * attempt))
                        .await
                        .map_err(|_| CloseReason::IdleTimeout)?;
                }
                Err(e) => return self.send(ServerFrame::from(&e)).await,
            }
        }
    }

    async fn handle_heartbeat(&mut self) -> Result<(), CloseReason> {
        self.state.heartbeat();
        if let Err(e) = self.ctx.tracker.heartbeat(&self.state.identity).await {
            tracing::warn!(identity = %self.state.identity, error = %e, "Heartbeat rejected");
            return self.send(ServerFrame::from(&e)).await;
        }
        self.send(ServerFrame::HeartbeatAck {}).await
    }

    async fn forward(&mut self, event: &HubEvent) -> Result<(), CloseReason> {
        match event {
            HubEvent::Message(message) => self.deliver_messages([message.clone()]).await,
            HubEvent::Presence(record) => self.send(record.clone().into()).await,
        }
    }

    /// Tell the client events were dropped, then backfill every message
    /// after the last one delivered and the current presence of both
    /// participants.
    async fn resync(&mut self, missed: u64) -> Result<(), CloseReason> {
        tracing::warn!(
            session_id = %self.state.session_id,
            identity = %self.state.identity,
            missed,
            "Session lagged, resyncing"
        );
        self.send(ServerFrame::ResyncRequired {}).await?;

        match self.ctx.store.list_since(self.state.last_message_id).await {
            Ok(messages) => self.deliver_messages(messages).await?,
            Err(e) => {
                tracing::error!(error = %e, "Backfill failed");
                self.send(ServerFrame::from(&e)).await?;
            }
        }

        for record in self.ctx.tracker.snapshot() {
            self.send(record.into()).await?;
        }
        Ok(())
    }

    async fn deliver_messages<I>(&mut self, messages: I) -> Result<(), CloseReason>
    where
        I: IntoIterator<Item = Message>,
    {
        for message in messages {
            if self.state.advance(message.id) {
                self.send(message.into()).await?;
            }
        }
        Ok(())
    }

    fn idle_deadline(&self) -> Instant {
        self.state.idle_deadline(self.ctx.expiry_window)
    }

    /// Queue a frame for the writer. A client that stops reading fills the
    /// queue; waiting for room is bounded by the idle deadline.
    async fn send(&self, frame: ServerFrame) -> Result<(), CloseReason> {
        match timeout_at(self.idle_deadline(), self.outbound.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(CloseReason::OutboundClosed),
            Err(_) => {
                tracing::debug!(
                    session_id = %self.state.session_id,
                    "Outbound queue stalled past expiry window"
                );
                Err(CloseReason::IdleTimeout)
            }
        }
    }
}

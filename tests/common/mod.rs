//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use futures::channel::mpsc::{unbounded, UnboundedSender};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use chat_presence::config::Settings;
use chat_presence::presentation::websocket::{
    ClientFrame, CloseReason, InboundFrame, ServerFrame, Session,
};
use chat_presence::startup::{build_router, AppState};

pub const HEARTBEAT_MS: u64 = 100;
pub const EXPIRY_MS: u64 = 400;

/// Settings for an isolated in-memory instance with short presence windows.
pub fn test_settings() -> Settings {
    let mut settings = Settings::defaults().expect("default settings");
    settings.database.url = "sqlite::memory:".into();
    settings.presence.heartbeat_interval_ms = HEARTBEAT_MS;
    settings.presence.expiry_window_ms = EXPIRY_MS;
    settings.store.retry_backoff_ms = 10;
    settings
}

/// Like [`test_settings`] with windows long enough that sessions never idle
/// out during a test.
pub fn relaxed_settings() -> Settings {
    let mut settings = test_settings();
    settings.presence.heartbeat_interval_ms = 1_000;
    settings.presence.expiry_window_ms = 10_000;
    settings
}

/// Test application builder
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    /// Create a new test application backed by an in-memory database
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let state = AppState::build(settings).await.expect("app state");
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Open a gateway session for `identity` without a socket.
    pub fn connect(&self, identity: &str) -> TestClient {
        self.connect_with_buffer(identity, 256)
    }

    /// Open a gateway session whose outbound queue holds `buffer` frames.
    pub fn connect_with_buffer(&self, identity: &str, buffer: usize) -> TestClient {
        let participant = self.state.participants.resolve(identity).unwrap();
        let (inbound_tx, inbound_rx) = unbounded::<InboundFrame>();
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);

        let session = Session::new(self.state.session_context(), participant, outbound_tx);
        let task = tokio::spawn(session.run(inbound_rx));

        TestClient {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
            task,
        }
    }
}

/// A gateway client driving a [`Session`] through channels.
pub struct TestClient {
    inbound: Option<UnboundedSender<InboundFrame>>,
    pub outbound: mpsc::Receiver<ServerFrame>,
    task: JoinHandle<CloseReason>,
}

impl TestClient {
    pub fn send_text(&self, text: &str) {
        self.push(Ok(ClientFrame::Send { text: text.into() }));
    }

    pub fn heartbeat(&self) {
        self.push(Ok(ClientFrame::Heartbeat {}));
    }

    pub fn push(&self, frame: InboundFrame) {
        if let Some(inbound) = &self.inbound {
            inbound.unbounded_send(frame).expect("session gone");
        }
    }

    /// Next frame, failing the test after two seconds.
    pub async fn next(&mut self) -> ServerFrame {
        tokio::time::timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("session closed")
    }

    /// Skip frames until one matches.
    pub async fn next_matching<F>(&mut self, mut pred: F) -> ServerFrame
    where
        F: FnMut(&ServerFrame) -> bool,
    {
        loop {
            let frame = self.next().await;
            if pred(&frame) {
                return frame;
            }
        }
    }

    /// Next MESSAGE frame as (sender, text).
    pub async fn next_message(&mut self) -> (String, String) {
        match self
            .next_matching(|f| matches!(f, ServerFrame::Message { .. }))
            .await
        {
            ServerFrame::Message { sender, text, .. } => (sender, text),
            _ => unreachable!(),
        }
    }

    /// Read the connect handshake: READY, replayed history, counterpart presence.
    pub async fn handshake(&mut self) -> Vec<ServerFrame> {
        let ready = self.next().await;
        assert!(matches!(ready, ServerFrame::Ready { .. }), "got {:?}", ready);

        let mut frames = vec![ready];
        loop {
            let frame = self.next().await;
            let done = matches!(frame, ServerFrame::Presence { .. });
            frames.push(frame);
            if done {
                return frames;
            }
        }
    }

    /// Close the inbound side and wait for the session to end.
    pub async fn close(mut self) -> CloseReason {
        self.inbound.take();
        self.finished().await
    }

    /// Wait for the session to end on its own.
    pub async fn finished(self) -> CloseReason {
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("session did not end")
            .expect("session panicked")
    }
}

/// Read a response body as JSON
pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn assert_status(response: &Response, status: StatusCode) {
    assert_eq!(response.status(), status);
}

//! WebSocket Connection Handler
//!
//! Upgrades `GET /gateway?identity=<name>` and bridges the socket to a
//! [`Session`].

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{future, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::messages::{ClientFrame, ServerFrame};
use super::session::Session;
use crate::domain::Participant;
use crate::presentation::http::extractors::ApiQuery;
use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub identity: String,
}

/// WebSocket upgrade handler. Unknown identities are refused before the
/// upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GatewayQuery>,
) -> Result<Response, AppError> {
    let identity = state.participants.resolve(&query.identity)?;

    let ws = ws
        .max_message_size(state.settings.websocket.max_message_size)
        .max_frame_size(state.settings.websocket.max_frame_size);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, identity: Participant) {
    let (mut sender, receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<ServerFrame>(state.settings.websocket.outbound_buffer);

    // Forward frames from the session to the socket
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match frame.to_json() {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Text frames are parsed, close and transport errors end the stream,
    // everything else is ignored.
    let inbound = receiver
        .take_while(|msg| future::ready(matches!(msg, Ok(m) if !matches!(m, Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => {
                    Some(ClientFrame::parse(text.as_str()).map_err(|e| e.to_string()))
                }
                _ => None,
            })
        });

    let session = Session::new(state.session_context(), identity, tx);
    tracing::debug!(session_id = %session.session_id(), "WebSocket upgraded");

    let reason = session.run(Box::pin(inbound)).await;
    tracing::debug!(reason = reason.as_str(), "WebSocket closing");

    // A client that stopped reading can hold the writer on a full socket.
    let flush = state.settings.presence.expiry_window();
    let abort = sender_task.abort_handle();
    if tokio::time::timeout(flush, sender_task).await.is_err() {
        tracing::debug!("Writer did not drain, aborting");
        abort.abort();
    }
}

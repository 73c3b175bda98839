//! Message Handlers

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::application::dto::{MessageResponse, MessagesQuery, SendMessageRequest};
use crate::presentation::http::extractors::{ApiJson, ApiQuery};
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// Message history, oldest first. `?after=<id>` returns only newer messages.
pub async fn list_messages(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = state.store.list_since(query.after).await?;

    let responses: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();

    Ok(Json(responses))
}

/// Append a message. Live sessions receive it through the hub.
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    let sender = state.participants.resolve(&body.sender)?;
    let message = state.store.append(&sender, &body.text).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

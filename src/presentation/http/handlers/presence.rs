//! Presence Handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::application::dto::PresenceResponse;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Presence of both participants
pub async fn list_presence(State(state): State<AppState>) -> Json<Vec<PresenceResponse>> {
    Json(
        state
            .tracker
            .snapshot()
            .into_iter()
            .map(PresenceResponse::from)
            .collect(),
    )
}

pub async fn get_presence(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<PresenceResponse>, AppError> {
    let identity = state.participants.resolve(&identity)?;
    Ok(Json(state.tracker.get(&identity).into()))
}

/// Heartbeat over HTTP, for clients that are not holding a gateway session
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<PresenceResponse>, AppError> {
    let identity = state.participants.resolve(&identity)?;
    let record = state.tracker.heartbeat(&identity).await?;
    Ok(Json(record.into()))
}

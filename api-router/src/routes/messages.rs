use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use common::storage::types::{document::DocumentId, message::ChatMessage};
use serde::Deserialize;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SendMessageParams {
    pub content: String,
    /// Prior turns, used only when the server does not keep history.
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionParams {
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
}

pub async fn get_messages(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.chat.history(DocumentId::from(id)).await?))
}

/// Answers one user turn; the response holds the turns added.
pub async fn send_message(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(params): Json<SendMessageParams>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let added = state
        .chat
        .send(DocumentId::from(id), &params.content, params.history)
        .await?;
    Ok(Json(added))
}

/// Opens the conversation; the response holds the full transcript.
pub async fn open_session(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    // The body is optional; an empty one opens with the stored history.
    let params: OpenSessionParams = if body.iter().all(u8::is_ascii_whitespace) {
        OpenSessionParams::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| ApiError::ValidationError(err.to_string()))?
    };
    let history = params.history;
    Ok(Json(state.chat.open(DocumentId::from(id), history).await?))
}

pub async fn clear_messages(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.chat.clear(DocumentId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Chat handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vlearn_models::ChatMessage;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::videos::parse_video_id;
use crate::metrics;
use crate::state::AppState;

const MAX_MESSAGE_LENGTH: usize = 5_000;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub video_id: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub response: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Answer a user message about a video; both turns are persisted.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let video_id = parse_video_id(&request.video_id)?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message cannot be empty"));
    }
    if message.len() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::bad_request("Message exceeds maximum length"));
    }

    let reply = state
        .orchestrator
        .chat(&user.uid, &video_id, message)
        .await?;

    metrics::record_chat_message();
    Ok(Json(SendMessageResponse {
        response: reply.content,
        timestamp: reply.timestamp,
    }))
}

#[derive(Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
}

/// Full persisted conversation for a video, in insertion order.
pub async fn get_chat_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ChatHistoryResponse>> {
    let video_id = parse_video_id(&video_id)?;
    let messages = state
        .orchestrator
        .user_library(&user.uid)
        .get_chat_history(&video_id)
        .await?;
    Ok(Json(ChatHistoryResponse { messages }))
}

#[derive(Serialize)]
pub struct ClearHistoryResponse {
    pub status: String,
}

pub async fn clear_chat_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ClearHistoryResponse>> {
    let video_id = parse_video_id(&video_id)?;
    state
        .orchestrator
        .user_library(&user.uid)
        .clear_chat_history(&video_id)
        .await?;
    Ok(Json(ClearHistoryResponse {
        status: "success".to_string(),
    }))
}

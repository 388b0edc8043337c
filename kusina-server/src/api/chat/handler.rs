//! Chat API Handlers

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use shared::chat::{ChatMessage, ChatSummary, SendMessage};
use validator::Validate;

use crate::api::extract::AppJson;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::error::from_validation_errors;
use crate::utils::{ApiResponse, AppResult, ok};

/// Conversation of one order, oldest first
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<ChatMessage>>> {
    Ok(ok(state.chat.list_by_order(&user, &id)?))
}

pub async fn send(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    AppJson(input): AppJson<SendMessage>,
) -> AppResult<ApiResponse<ChatMessage>> {
    Ok(ok(state.chat.send_message(&user, &id, input)?))
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    /// Timestamp of the newest message now marked read, if any
    pub read_up_to: Option<i64>,
}

pub async fn mark_read(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MarkReadResponse>> {
    let read_up_to = state.chat.mark_as_read(&user, &id)?;
    Ok(ok(MarkReadResponse { read_up_to }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SummaryRequest {
    #[validate(length(max = 200))]
    pub order_ids: Vec<String>,
}

/// Batch unread count + last message
pub async fn summary(
    State(state): State<ServerState>,
    user: CurrentUser,
    AppJson(req): AppJson<SummaryRequest>,
) -> AppResult<ApiResponse<Vec<ChatSummary>>> {
    req.validate().map_err(from_validation_errors)?;
    Ok(ok(state.chat.unread_and_last(&user, &req.order_ids)?))
}

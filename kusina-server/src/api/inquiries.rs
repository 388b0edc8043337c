//! 咨询路由: 校验后转发给店家，不等待投递结果

use axum::{Router, extract::State, routing::post};
use serde::Serialize;
use validator::Validate;

use crate::api::extract::AppJson;
use crate::core::ServerState;
use crate::services::Inquiry;
use crate::services::notification::dispatch;
use crate::utils::error::from_validation_errors;
use crate::utils::{ApiResponse, AppResult, ok};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/inquiries", post(submit))
}

#[derive(Debug, Serialize)]
pub struct InquiryAccepted {
    pub accepted: bool,
}

async fn submit(
    State(state): State<ServerState>,
    AppJson(inquiry): AppJson<Inquiry>,
) -> AppResult<ApiResponse<InquiryAccepted>> {
    inquiry.validate().map_err(from_validation_errors)?;
    dispatch(state.notifier.clone(), inquiry);
    Ok(ok(InquiryAccepted { accepted: true }))
}

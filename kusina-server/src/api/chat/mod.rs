//! Chat API Module
//!
//! 每个订单一个会话；写入规则 (开放状态、图片权限) 由 [`ChatChannel`] 决定。
//!
//! [`ChatChannel`]: crate::chat::ChatChannel

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/orders/{id}/messages",
            get(handler::list).post(handler::send),
        )
        .route("/api/orders/{id}/messages/read", post(handler::mark_read))
        .route("/api/chat/summary", post(handler::summary))
}

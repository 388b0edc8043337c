//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 健康检查 | 无 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | degraded)
    status: &'static str,
    version: &'static str,
    environment: String,
    /// 数据库可读
    database: bool,
    /// 当前 SSE 订阅数
    subscribers: usize,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let database = match state.orders.storage().get_order_count() {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check: database unreadable");
            false
        }
    };

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        database,
        subscribers: state.message_bus.subscriber_count(),
    })
}

//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 下单、状态流转、列表视图、尾款凭证
//! - [`chat`] - 订单聊天
//! - [`upload`] - 一次性上传地址与 blob 读取
//! - [`menu`] - 菜单 (公共)
//! - [`pricing`] - 优惠券试算、配送费
//! - [`inquiries`] - 咨询转发
//! - [`events`] - SSE 实时推送
//!
//! [`build_app`] 组装全部路由与中间件，HTTP 服务和集成测试共用。

pub mod chat;
pub mod events;
pub mod extract;
pub mod health;
pub mod inquiries;
pub mod menu;
pub mod orders;
pub mod pricing;
pub mod upload;

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use http::{HeaderName, HeaderValue};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::core::ServerState;
use crate::services::blob_store::MAX_FILE_SIZE;
use crate::utils::{AppError, ErrorCode};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Multipart framing on top of the largest accepted file
const BODY_LIMIT: usize = MAX_FILE_SIZE + 64 * 1024;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());
    response
}

/// 超时 → 503 TimeoutError
async fn handle_timeout(err: tower::BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::new(ErrorCode::TimeoutError)
    } else {
        AppError::internal(format!("Unhandled middleware error: {}", err))
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Health API - public route
        .merge(health::router())
        // Menu API - public route
        .merge(menu::router())
        // Upload API - token PUT and blob reads are public
        .merge(upload::router())
        // Order, chat and pricing APIs - authentication required
        .merge(orders::router())
        .merge(chat::router())
        .merge(pricing::router())
        .merge(inquiries::router())
        .merge(events::router())
}

/// Build a fully configured application with all middleware
///
/// This is used by both the HTTP server and the integration tests.
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);

    build_router()
        // Get user context (JWT authentication) - injects CurrentUser
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        // Request timeout - SSE bodies stream after the response head, so they are not cut
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(timeout)),
        )
        // Request ID - generate and echo back
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        // Trace - Request tracing
        .layer(TraceLayer::new_for_http())
        // Request logging
        .layer(middleware::from_fn(log_request))
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
}

//! Upload Routes
//!
//! 两步上传：先申请一次性上传地址 (需认证)，再用令牌 PUT 文件内容 (令牌即凭证)。
//! 已存储的 blob 公开读取。

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        // 申请上传地址 - 需要认证
        .route("/api/uploads/url", post(handler::request_upload_url))
        // 令牌上传 - 公共路由
        .route("/api/uploads/{token}", put(handler::upload_with_token))
        // 读取 blob - 公共路由
        .route("/api/blobs/{id}", get(handler::serve_blob))
}

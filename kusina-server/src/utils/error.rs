//! 统一错误处理
//!
//! 错误类型定义在 `shared::error`，这里负责：
//! - 重新导出 [`AppError`] / [`ApiResponse`]
//! - 将 axum 提取器错误、`validator` 错误转换为 [`AppError`]
//!
//! # 错误码规范
//!
//! | 范围 | 分类 | 示例 |
//! |------|------|------|
//! | 0xxx | 通用/校验 | 2 ValidationFailed |
//! | 1xxx | 认证 | 1003 TokenExpired |
//! | 2xxx | 权限 | 2003 NotOrderOwner |
//! | 4xxx | 订单 | 4005 InvalidTransition |
//! | 5xxx | 支付 | 5003 ProofNotRequired |
//! | 6xxx | 聊天/上传 | 6001 ChatClosed |
//! | 7xxx | 优惠券 | 7002 VoucherInvalid |
//! | 9xxx | 系统 | 9404 SystemBusy |
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::not_order_owner(order_id))
//!
//! // 返回成功响应
//! Ok(ok(order))
//! ```

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use serde::Serialize;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

/// 创建成功响应
pub fn ok<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse::success(data)
}

/// `validator` 校验错误 → ValidationFailed，字段错误放入 details
pub fn from_validation_errors(errors: validator::ValidationErrors) -> AppError {
    let fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    AppError::validation(errors.to_string()).with_detail("fields", fields)
}

pub fn from_json_rejection(rejection: JsonRejection) -> AppError {
    AppError::with_message(ErrorCode::InvalidFormat, rejection.body_text())
}

pub fn from_query_rejection(rejection: QueryRejection) -> AppError {
    AppError::with_message(ErrorCode::InvalidRequest, rejection.body_text())
}

pub fn from_multipart_error(err: MultipartError) -> AppError {
    AppError::invalid_request(format!("Invalid multipart request: {}", err))
}

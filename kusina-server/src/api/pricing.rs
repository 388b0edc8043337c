//! 价格辅助路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/vouchers/validate | POST | 优惠券试算 (不核销) |
//! | /api/delivery-fee | GET | 按地址查询配送费 |

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use shared::models::VoucherValidation;
use shared::order::money::is_valid_amount;
use validator::Validate;

use crate::api::extract::{AppJson, AppQuery};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::error::from_validation_errors;
use crate::utils::validation::MAX_ADDRESS_LEN;
use crate::utils::{ApiResponse, AppError, AppResult, ok};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/vouchers/validate", post(validate_voucher))
        .route("/api/delivery-fee", get(delivery_fee))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateVoucherRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    /// Cart subtotal the voucher would apply to
    pub order_amount: f64,
}

async fn validate_voucher(
    State(state): State<ServerState>,
    _user: CurrentUser,
    AppJson(req): AppJson<ValidateVoucherRequest>,
) -> AppResult<ApiResponse<VoucherValidation>> {
    req.validate().map_err(from_validation_errors)?;
    if !is_valid_amount(req.order_amount) {
        return Err(AppError::validation("order_amount must be a non-negative amount"));
    }
    let result = state
        .vouchers
        .validate(&req.code, req.order_amount, shared::util::now_millis())?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
pub struct DeliveryFeeQuery {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct DeliveryFeeResponse {
    pub fee: f64,
}

async fn delivery_fee(
    State(state): State<ServerState>,
    _user: CurrentUser,
    AppQuery(query): AppQuery<DeliveryFeeQuery>,
) -> AppResult<ApiResponse<DeliveryFeeResponse>> {
    crate::utils::validation::validate_required_text(&query.address, "address", MAX_ADDRESS_LEN)?;
    Ok(ok(DeliveryFeeResponse {
        fee: state.delivery_fees.fee_for(&query.address),
    }))
}

//! Order API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | POST | 下单 (顾客) |
//! | /api/orders | GET | 订单列表 (过滤/分桶) |
//! | /api/orders/gate | GET | 单一待处理订单闸门 |
//! | /api/orders/active | GET | 当前进行中订单 |
//! | /api/orders/active/list | GET | 全部进行中订单 |
//! | /api/orders/pre-orders | GET | 预订单 |
//! | /api/orders/{id} | GET / PATCH | 详情 / 状态与字段变更 |
//! | /api/orders/{id}/cancel | POST | 顾客取消 |
//! | /api/orders/{id}/confirm-denial | POST | 确认拒单并清除 |
//! | /api/orders/{id}/payment | GET | 支付状态 |
//! | /api/orders/{id}/remaining-proof | POST / GET / DELETE | 尾款凭证暂存 |
//! | /api/orders/{id}/remaining-proof/confirm | POST | 提交暂存凭证 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", post(handler::create).get(handler::list))
        .nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // 顾客视图 (餐厅侧需带 customer_id)
        .route("/gate", get(handler::gate))
        .route("/active", get(handler::active))
        .route("/active/list", get(handler::active_list))
        .route("/pre-orders", get(handler::pre_orders))
        // 单个订单
        .route("/{id}", get(handler::get_by_id).patch(handler::update))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/confirm-denial", post(handler::confirm_denial))
        .route("/{id}/payment", get(handler::payment))
        // 尾款凭证
        .route(
            "/{id}/remaining-proof",
            post(handler::stage_proof)
                .get(handler::get_staged_proof)
                .delete(handler::cancel_staged_proof),
        )
        .route("/{id}/remaining-proof/confirm", post(handler::confirm_proof))
}

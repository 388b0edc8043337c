//! Menu API Module (公共路由，只读)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/menu", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/categories", get(handler::categories))
        .route("/items", get(handler::items))
        .route("/items/{id}/variants", get(handler::variants))
        .route("/items/{id}/choice-groups", get(handler::choice_groups))
}

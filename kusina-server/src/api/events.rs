//! 实时事件路由 (Server-Sent Events)
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/events | GET | 订单/聊天变更推送 | 需要 |
//!
//! 顾客只收到自己订单的事件，店家 (owner/staff) 收到全部事件。
//! 订阅者跟不上时丢弃积压的消息，客户端应在重连后重新拉取列表。

use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::Stream;
use shared::message::BusMessage;
use tokio::sync::broadcast::error::RecvError;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::message::SubscriptionGuard;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events", get(events))
}

async fn events(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let side = user.role.side();
    let guard = SubscriptionGuard::new(state.message_bus.clone(), &user.id, side);
    let rx = state.message_bus.subscribe();

    let stream = futures::stream::unfold(
        (rx, guard, user.id),
        move |(mut rx, guard, user_id)| async move {
            loop {
                match rx.recv().await {
                    Ok(msg) if msg.visible_to(&user_id, side) => {
                        let Some(event) = to_event(&msg) else {
                            continue;
                        };
                        return Some((Ok(event), (rx, guard, user_id)));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(user_id = %user_id, skipped, "SSE subscriber lagged, events dropped");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_event(msg: &BusMessage) -> Option<Event> {
    match Event::default()
        .event(msg.event_type().to_string())
        .id(msg.request_id.to_string())
        .json_data(msg)
    {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(order_id = %msg.order_id, error = %e, "Failed to encode SSE event");
            None
        }
    }
}

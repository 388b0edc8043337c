//! 消息总线模块 - 订单与聊天的实时通知
//!
//! - [`MessageBus`]: 基于 `tokio::sync::broadcast` 的发布/订阅
//! - [`SubscriptionGuard`]: SSE 连接生命周期登记

pub mod bus;

pub use bus::{MessageBus, Subscriber, SubscriptionGuard};
pub use shared::message::{BusMessage, BusPayload, EventType};

//! 消息总线核心实现
//!
//! # 消息流
//!
//! ```text
//! OrdersManager ──┐
//!                 ├─▶ publish() ──▶ broadcast::Sender<BusMessage>
//! ChatChannel ────┘                         │
//!                                           ▼
//!                               SSE 订阅者 (GET /api/events)
//! ```
//!
//! 只有在 redb 事务提交成功后才会发布消息。没有订阅者时发布不是错误。

use std::sync::Arc;

use dashmap::DashMap;
use shared::message::BusMessage;
use shared::order::ActorSide;
use tokio::sync::broadcast;

/// 广播通道默认容量
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// 已连接的订阅者信息
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub user_id: String,
    pub side: ActorSide,
    pub connected_at: i64,
}

/// 消息总线
///
/// # 职责
///
/// - 发布已提交的订单/聊天变更
/// - 跟踪当前 SSE 订阅者 (用于健康检查)
#[derive(Debug, Clone)]
pub struct MessageBus {
    server_tx: broadcast::Sender<BusMessage>,
    /// 订阅者 (Connection ID -> Subscriber)
    subscribers: Arc<DashMap<String, Subscriber>>,
}

impl MessageBus {
    /// 创建默认容量的消息总线
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// 创建指定容量的消息总线
    pub fn with_capacity(capacity: usize) -> Self {
        let (server_tx, _) = broadcast::channel(capacity);
        Self {
            server_tx,
            subscribers: Arc::new(DashMap::new()),
        }
    }

    /// 发布消息 (服务器 -> 所有订阅者)
    ///
    /// 返回收到消息的订阅者数量。
    pub fn publish(&self, msg: BusMessage) -> usize {
        let event_type = msg.event_type();
        match self.server_tx.send(msg) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(event_type = %event_type, "Event broadcast skipped: no active receivers");
                0
            }
        }
    }

    /// 订阅服务器广播
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// 登记一个订阅连接，返回连接 ID
    pub fn register(&self, user_id: &str, side: ActorSide) -> String {
        let connection_id = uuid::Uuid::new_v4().to_string();
        self.subscribers.insert(
            connection_id.clone(),
            Subscriber {
                user_id: user_id.to_string(),
                side,
                connected_at: shared::util::now_millis(),
            },
        );
        tracing::debug!(connection_id = %connection_id, user_id = %user_id, "Subscriber connected");
        connection_id
    }

    /// 注销订阅连接
    pub fn unregister(&self, connection_id: &str) {
        if self.subscribers.remove(connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Subscriber disconnected");
        }
    }

    /// 当前订阅连接数
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 在连接结束 (stream 被丢弃) 时自动注销
#[derive(Debug)]
pub struct SubscriptionGuard {
    bus: MessageBus,
    connection_id: String,
}

impl SubscriptionGuard {
    pub fn new(bus: MessageBus, user_id: &str, side: ActorSide) -> Self {
        let connection_id = bus.register(user_id, side);
        Self { bus, connection_id }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.bus.unregister(&self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::ActorSide;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = MessageBus::with_capacity(8);
        let mut rx = bus.subscribe();

        let sent = bus.publish(BusMessage::messages_read("o1", "c1", ActorSide::Customer, 5));
        assert_eq!(sent, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.order_id, "o1");
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let bus = MessageBus::new();
        assert_eq!(
            bus.publish(BusMessage::messages_read("o1", "c1", ActorSide::Customer, 5)),
            0
        );
    }

    #[test]
    fn test_guard_unregisters_on_drop() {
        let bus = MessageBus::new();
        {
            let _guard = SubscriptionGuard::new(bus.clone(), "c1", ActorSide::Customer);
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }
}

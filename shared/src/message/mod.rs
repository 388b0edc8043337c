//! 消息总线消息类型定义
//!
//! 服务端在订单或聊天变更提交后广播这些消息，客户端通过
//! Server-Sent Events 订阅。

use crate::chat::ChatMessage;
use crate::order::{ActorSide, Order};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OrderUpdated,
    MessageSent,
    MessagesRead,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::OrderUpdated => write!(f, "order_updated"),
            EventType::MessageSent => write!(f, "message_sent"),
            EventType::MessagesRead => write!(f, "messages_read"),
        }
    }
}

/// 业务负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusPayload {
    /// 订单创建或更新后的完整快照
    OrderUpdated { order: Box<Order> },
    MessageSent { message: ChatMessage },
    /// 某一方的已读水位前移
    MessagesRead { side: ActorSide, read_up_to: i64 },
}

/// 总线消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// 用于消息追踪
    pub request_id: Uuid,
    pub timestamp: i64,
    pub order_id: String,
    /// 订单所属顾客，用于订阅过滤
    pub customer_id: String,
    pub payload: BusPayload,
}

impl BusMessage {
    fn new(order_id: &str, customer_id: &str, payload: BusPayload) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: crate::util::now_millis(),
            order_id: order_id.to_string(),
            customer_id: customer_id.to_string(),
            payload,
        }
    }

    pub fn order_updated(order: &Order) -> Self {
        Self::new(
            &order.order_id,
            &order.customer_id,
            BusPayload::OrderUpdated {
                order: Box::new(order.clone()),
            },
        )
    }

    pub fn message_sent(customer_id: &str, message: ChatMessage) -> Self {
        let order_id = message.order_id.clone();
        Self::new(&order_id, customer_id, BusPayload::MessageSent { message })
    }

    pub fn messages_read(
        order_id: &str,
        customer_id: &str,
        side: ActorSide,
        read_up_to: i64,
    ) -> Self {
        Self::new(
            order_id,
            customer_id,
            BusPayload::MessagesRead { side, read_up_to },
        )
    }

    pub fn event_type(&self) -> EventType {
        match self.payload {
            BusPayload::OrderUpdated { .. } => EventType::OrderUpdated,
            BusPayload::MessageSent { .. } => EventType::MessageSent,
            BusPayload::MessagesRead { .. } => EventType::MessagesRead,
        }
    }

    /// 顾客只能收到自己订单的消息，店家可收到全部
    pub fn visible_to(&self, user_id: &str, side: ActorSide) -> bool {
        match side {
            ActorSide::Restaurant => true,
            ActorSide::Customer => self.customer_id == user_id,
        }
    }
}

//! ChatChannel - per-order messaging between customer and restaurant
//!
//! Sends run the chat gate against the stored order inside the same redb
//! write transaction that appends the message, so a message can never land
//! after the order was closed for chat by a concurrent update.

use super::storage::ChatStorage;
use crate::auth::CurrentUser;
use crate::message::MessageBus;
use crate::orders::{OrderStorage, StorageError};
use chrono_tz::Tz;
use shared::chat::{
    ChatMessage, ChatSummary, MAX_MESSAGE_LEN, MessageKind, SendMessage, is_chat_open,
};
use shared::error::{AppError, ErrorCode};
use shared::message::BusMessage;
use shared::order::{ActorSide, Order};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {0} belongs to another customer")]
    NotOrderOwner(String),

    #[error("Chat is closed for order {0}")]
    Closed(String),

    #[error("The restaurant has not enabled image messages for this order")]
    ImagesNotAllowed,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Storage(e) => {
                let code = e.error_code();
                tracing::error!(error = %e, error_code = ?code, "Chat storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            ChatError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {}", id))
                    .with_detail("order_id", id)
            }
            ChatError::NotOrderOwner(id) => AppError::not_order_owner(id),
            e @ ChatError::Closed(_) => AppError::with_message(ErrorCode::ChatClosed, e.to_string()),
            e @ ChatError::ImagesNotAllowed => {
                AppError::with_message(ErrorCode::ImagesNotAllowed, e.to_string())
            }
            ChatError::InvalidMessage(msg) => AppError::with_message(ErrorCode::InvalidMessage, msg),
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Clone)]
pub struct ChatChannel {
    orders: OrderStorage,
    chat: ChatStorage,
    bus: MessageBus,
    tz: Tz,
}

impl std::fmt::Debug for ChatChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatChannel").field("tz", &self.tz).finish()
    }
}

impl ChatChannel {
    pub fn new(orders: OrderStorage, bus: MessageBus, tz: Tz) -> Result<Self, StorageError> {
        let chat = ChatStorage::new(orders.database())?;
        Ok(Self {
            orders,
            chat,
            bus,
            tz,
        })
    }

    fn authorize(actor: &CurrentUser, order: &Order) -> ChatResult<()> {
        if actor.is_customer() && !order.is_owned_by(&actor.id) {
            crate::security_log!(
                "WARN",
                "chat_access_denied",
                user_id = actor.id.as_str(),
                order_id = order.order_id.as_str()
            );
            return Err(ChatError::NotOrderOwner(order.order_id.clone()));
        }
        Ok(())
    }

    fn load_order(&self, actor: &CurrentUser, order_id: &str) -> ChatResult<Order> {
        let order = self
            .orders
            .get_order(order_id)?
            .ok_or_else(|| ChatError::OrderNotFound(order_id.to_string()))?;
        Self::authorize(actor, &order)?;
        Ok(order)
    }

    /// Append a message if the order's chat is open
    pub fn send_message(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        input: SendMessage,
    ) -> ChatResult<ChatMessage> {
        let kind = input.resolved_kind();
        let body = input.body.trim();
        if body.is_empty() {
            return Err(ChatError::InvalidMessage(
                "message body must not be empty".to_string(),
            ));
        }
        if body.chars().count() > MAX_MESSAGE_LEN {
            return Err(ChatError::InvalidMessage(format!(
                "message is too long (max {MAX_MESSAGE_LEN} characters)"
            )));
        }

        let now = shared::util::now_millis();
        let txn = self.chat.begin_write()?;
        let order = self
            .orders
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| ChatError::OrderNotFound(order_id.to_string()))?;
        Self::authorize(actor, &order)?;

        if !is_chat_open(&order, now, self.tz) {
            return Err(ChatError::Closed(order_id.to_string()));
        }
        if kind == MessageKind::Image && actor.is_customer() && !order.allow_customer_images {
            return Err(ChatError::ImagesNotAllowed);
        }

        // Strictly increasing per order, even if the clock stalls
        let timestamp = match self.chat.last_message_txn(&txn, order_id)? {
            Some(last) => now.max(last.timestamp + 1),
            None => now,
        };

        let message = ChatMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            timestamp,
            sender_id: actor.id.clone(),
            sender_name: actor.display_name.clone(),
            sender_role: actor.role.sender_role(),
            body: body.to_string(),
            kind,
        };
        self.chat.append_message(&txn, &message)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(
            order_id = %order_id,
            sender_id = %actor.id,
            kind = ?kind,
            "Chat message sent"
        );
        self.bus
            .publish(BusMessage::message_sent(&order.customer_id, message.clone()));
        Ok(message)
    }

    /// Messages of one order, oldest first
    pub fn list_by_order(&self, actor: &CurrentUser, order_id: &str) -> ChatResult<Vec<ChatMessage>> {
        self.load_order(actor, order_id)?;
        Ok(self.chat.get_messages(order_id)?)
    }

    /// Advance the caller's read watermark to the newest message
    ///
    /// Idempotent; returns the watermark after the call (`None` while the
    /// order has no messages and nothing was ever read).
    pub fn mark_as_read(&self, actor: &CurrentUser, order_id: &str) -> ChatResult<Option<i64>> {
        let side = actor.role.side();
        let txn = self.chat.begin_write()?;
        let order = self
            .orders
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| ChatError::OrderNotFound(order_id.to_string()))?;
        Self::authorize(actor, &order)?;

        let current = self.chat.read_mark_txn(&txn, order_id, side)?;
        let newest = self
            .chat
            .last_message_txn(&txn, order_id)?
            .map(|m| m.timestamp);

        let advanced = match (current, newest) {
            (_, None) => None,
            (Some(mark), Some(ts)) if ts <= mark => None,
            (_, Some(ts)) => Some(ts),
        };
        let Some(read_up_to) = advanced else {
            // Nothing new: dropping the transaction aborts it
            return Ok(current);
        };

        self.chat.set_read_mark(&txn, order_id, side, read_up_to)?;
        txn.commit().map_err(StorageError::from)?;

        self.bus.publish(BusMessage::messages_read(
            order_id,
            &order.customer_id,
            side,
            read_up_to,
        ));
        Ok(Some(read_up_to))
    }

    /// Unread count (for the caller's side) and last message per order
    ///
    /// Orders the caller may not see, or that do not exist, are skipped.
    pub fn unread_and_last(
        &self,
        actor: &CurrentUser,
        order_ids: &[String],
    ) -> ChatResult<Vec<ChatSummary>> {
        let side = actor.role.side();
        let mut summaries = Vec::with_capacity(order_ids.len());

        for order_id in order_ids {
            let visible = match self.load_order(actor, order_id) {
                Ok(_) => true,
                Err(ChatError::OrderNotFound(_) | ChatError::NotOrderOwner(_)) => false,
                Err(e) => return Err(e),
            };
            if !visible {
                continue;
            }

            let messages = self.chat.get_messages(order_id)?;
            let mark = self.chat.read_mark(order_id, side)?;
            summaries.push(summarize(order_id, &messages, side, mark));
        }
        Ok(summaries)
    }

    /// Timestamp of the newest message per order, for orders that have one
    pub fn last_message_times(&self, orders: &[Order]) -> ChatResult<HashMap<String, i64>> {
        let mut times = HashMap::new();
        for order in orders {
            if let Some(last) = self.chat.get_messages(&order.order_id)?.last() {
                times.insert(order.order_id.clone(), last.timestamp);
            }
        }
        Ok(times)
    }
}

/// Messages from the other side newer than the reader's watermark are unread
fn summarize(
    order_id: &str,
    messages: &[ChatMessage],
    reader: ActorSide,
    mark: Option<i64>,
) -> ChatSummary {
    let unread_count = messages
        .iter()
        .filter(|m| m.side() != reader && mark.is_none_or(|mark| m.timestamp > mark))
        .count();
    ChatSummary {
        order_id: order_id.to_string(),
        unread_count: u32::try_from(unread_count).unwrap_or(u32::MAX),
        last_message: messages.last().cloned(),
    }
}

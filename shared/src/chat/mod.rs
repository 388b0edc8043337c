//! Order chat model
//!
//! Messages are immutable once stored. Unread state is derived from a read
//! watermark per (order, side), never from per-message flags.

pub mod message;

pub use message::{
    ChatMessage, ChatSummary, MAX_MESSAGE_LEN, MessageKind, SendMessage, SenderRole,
    classify_body, is_chat_open,
};

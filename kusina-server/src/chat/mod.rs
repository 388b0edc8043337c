//! 订单聊天
//!
//! - [`ChatChannel`] - 发送、列表、已读水位、未读汇总
//! - [`ChatStorage`] - redb 表

pub mod channel;
pub mod storage;

pub use channel::{ChatChannel, ChatError, ChatResult};
pub use storage::ChatStorage;

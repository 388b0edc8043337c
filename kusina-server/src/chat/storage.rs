//! redb tables for order chat
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `chat_messages` | `(order_id, seq)` | `ChatMessage` (JSON) |
//! | `chat_read_marks` | `(order_id, side)` | read watermark (millis) |
//! | `chat_seq` | `order_id` | last seq |
//!
//! Shares the database file with [`OrderStorage`](crate::orders::OrderStorage),
//! so a message write transaction can read the order it belongs to.

use crate::orders::{StorageError, StorageResult};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::chat::ChatMessage;
use shared::order::ActorSide;
use std::sync::Arc;

/// Messages: key = (order_id, seq), value = JSON-serialized ChatMessage
const MESSAGES_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("chat_messages");

/// 已读水位: key = (order_id, side)
const READ_MARKS_TABLE: TableDefinition<(&str, &str), i64> =
    TableDefinition::new("chat_read_marks");

const SEQ_TABLE: TableDefinition<&str, u64> = TableDefinition::new("chat_seq");

#[derive(Clone)]
pub struct ChatStorage {
    db: Arc<Database>,
}

impl ChatStorage {
    /// Attach to a database opened by `OrderStorage`, creating the chat tables
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MESSAGES_TABLE)?;
            let _ = write_txn.open_table(READ_MARKS_TABLE)?;
            let _ = write_txn.open_table(SEQ_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Append a message, returns its per-order sequence
    pub fn append_message(&self, txn: &WriteTransaction, message: &ChatMessage) -> StorageResult<u64> {
        let seq = {
            let mut seq_table = txn.open_table(SEQ_TABLE)?;
            let next = seq_table
                .get(message.order_id.as_str())?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            seq_table.insert(message.order_id.as_str(), next)?;
            next
        };

        let value = serde_json::to_vec(message)?;
        let mut table = txn.open_table(MESSAGES_TABLE)?;
        table.insert((message.order_id.as_str(), seq), value.as_slice())?;
        Ok(seq)
    }

    /// Newest message of an order (within transaction)
    pub fn last_message_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<ChatMessage>> {
        let table = txn.open_table(MESSAGES_TABLE)?;
        let mut range = table.range((order_id, 0u64)..=(order_id, u64::MAX))?;
        match range.next_back() {
            Some(entry) => {
                let (_key, value) = entry?;
                Ok(Some(serde_json::from_slice(value.value())?))
            }
            None => Ok(None),
        }
    }

    /// All messages of an order in send order
    pub fn get_messages(&self, order_id: &str) -> StorageResult<Vec<ChatMessage>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MESSAGES_TABLE)?;

        let mut messages: Vec<ChatMessage> = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            messages.push(serde_json::from_slice(value.value())?);
        }

        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    pub fn read_mark(&self, order_id: &str, side: ActorSide) -> StorageResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(READ_MARKS_TABLE)?;
        Ok(table.get((order_id, side.as_str()))?.map(|v| v.value()))
    }

    pub fn read_mark_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        side: ActorSide,
    ) -> StorageResult<Option<i64>> {
        let table = txn.open_table(READ_MARKS_TABLE)?;
        Ok(table.get((order_id, side.as_str()))?.map(|v| v.value()))
    }

    pub fn set_read_mark(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        side: ActorSide,
        read_up_to: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(READ_MARKS_TABLE)?;
        table.insert((order_id, side.as_str()), read_up_to)?;
        Ok(())
    }

    /// Begin a write transaction on the shared database
    pub fn begin_write(&self) -> Result<WriteTransaction, StorageError> {
        Ok(self.db.begin_write()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderStorage;
    use shared::chat::{MessageKind, SenderRole};

    fn storage() -> ChatStorage {
        let orders = OrderStorage::open_in_memory().unwrap();
        ChatStorage::new(orders.database()).unwrap()
    }

    fn message(order_id: &str, timestamp: i64, body: &str) -> ChatMessage {
        ChatMessage {
            message_id: format!("{order_id}-{timestamp}"),
            order_id: order_id.to_string(),
            timestamp,
            sender_id: "c1".to_string(),
            sender_name: "Ana".to_string(),
            sender_role: SenderRole::Customer,
            body: body.to_string(),
            kind: MessageKind::Text,
        }
    }

    #[test]
    fn test_messages_are_scoped_per_order() {
        let storage = storage();
        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.append_message(&txn, &message("o1", 10, "hi")).unwrap(), 1);
        assert_eq!(storage.append_message(&txn, &message("o2", 11, "other")).unwrap(), 1);
        assert_eq!(storage.append_message(&txn, &message("o1", 12, "there")).unwrap(), 2);
        let last = storage.last_message_txn(&txn, "o1").unwrap().unwrap();
        assert_eq!(last.body, "there");
        txn.commit().unwrap();

        let bodies: Vec<_> = storage
            .get_messages("o1")
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["hi", "there"]);
        assert!(storage.get_messages("o3").unwrap().is_empty());
    }

    #[test]
    fn test_read_marks_per_side() {
        let storage = storage();
        assert_eq!(storage.read_mark("o1", ActorSide::Customer).unwrap(), None);

        let txn = storage.begin_write().unwrap();
        storage.set_read_mark(&txn, "o1", ActorSide::Customer, 42).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.read_mark("o1", ActorSide::Customer).unwrap(), Some(42));
        assert_eq!(storage.read_mark("o1", ActorSide::Restaurant).unwrap(), None);
    }

    #[test]
    fn test_aborted_write_leaves_no_message() {
        let storage = storage();
        {
            let txn = storage.begin_write().unwrap();
            storage.append_message(&txn, &message("o1", 10, "lost")).unwrap();
        }
        assert!(storage.get_messages("o1").unwrap().is_empty());
    }
}

//! redb-based storage layer for orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Order aggregates |
//! | `customer_orders` | `customer_id` | `order_id` (multimap) | Per-customer index |
//! | `sequence_counter` | `"order_count"` | `u64` | Receipt number counter |
//!
//! Chat tables live in the same database file (see `chat::storage`) so the
//! chat gate can read the order inside the message write transaction.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default: once `commit()`
//! returns the data is on disk, and the copy-on-write pages keep the file
//! consistent across power loss.

use redb::{
    Database, MultimapTableDefinition, ReadableDatabase, ReadableMultimapTable, ReadableTable,
    TableDefinition, WriteTransaction,
};
use shared::error::ErrorCode;
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Customer index: key = customer_id, values = order_ids
const CUSTOMER_ORDERS_TABLE: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("customer_orders");

/// Counters: key = "order_count", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const ORDER_COUNT_KEY: &str = "order_count";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// 将存储错误转换为错误码（客户端负责本地化）
    pub fn error_code(&self) -> ErrorCode {
        if let StorageError::Serialization(_) = self {
            return ErrorCode::InternalError;
        }

        // redb 错误通过字符串匹配分类
        let err_str = self.to_string().to_lowercase();

        if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
        {
            return ErrorCode::StorageFull;
        }

        if err_str.contains("corrupt") || err_str.contains("invalid database") {
            return ErrorCode::StorageCorrupted;
        }

        // 默认：系统繁忙（redb 的 Database/Transaction/Table/Storage/Commit 错误）
        ErrorCode::SystemBusy
    }
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_multimap_table(CUSTOMER_ORDERS_TABLE)?;
            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(ORDER_COUNT_KEY)?.is_none() {
                seq_table.insert(ORDER_COUNT_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Shared handle for other stores living in the same file
    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Counter (for receipt number) ==========

    /// Get and increment order count atomically
    ///
    /// Runs in its own write transaction, so call it before opening the
    /// transaction that stores the order (redb has no nested writers).
    /// Returns the NEW count after increment.
    pub fn next_order_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(ORDER_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(ORDER_COUNT_KEY, next)?;
        drop(table);
        txn.commit()?;
        Ok(next)
    }

    /// Get current order count (without incrementing)
    pub fn get_order_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(ORDER_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0))
    }

    // ========== Order Operations ==========

    /// Store an order and index it under its customer
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let value = serde_json::to_vec(order)?;
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.insert(order.order_id.as_str(), value.as_slice())?;

        let mut index = txn.open_multimap_table(CUSTOMER_ORDERS_TABLE)?;
        index.insert(order.customer_id.as_str(), order.order_id.as_str())?;
        Ok(())
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All orders of one customer, in index order
    pub fn get_orders_for_customer(&self, customer_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_multimap_table(CUSTOMER_ORDERS_TABLE)?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for order_id in index.get(customer_id)? {
            let order_id = order_id?;
            if let Some(value) = table.get(order_id.value())? {
                orders.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(orders)
    }

    /// All orders of one customer (within transaction)
    ///
    /// Used by the single-pending-order gate so the check and the insert
    /// see the same snapshot.
    pub fn get_orders_for_customer_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
    ) -> StorageResult<Vec<Order>> {
        let index = txn.open_multimap_table(CUSTOMER_ORDERS_TABLE)?;
        let table = txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for order_id in index.get(customer_id)? {
            let order_id = order_id?;
            if let Some(value) = table.get(order_id.value())? {
                orders.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(orders)
    }

    /// Every stored order
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{Fulfillment, OrderLineItem, OrderStatus, OrderType, PaymentPlan};

    fn sample(id: &str, customer_id: &str) -> Order {
        Order {
            order_id: id.to_string(),
            order_number: format!("KSN2026101810001-{id}"),
            created_at: 1,
            updated_at: 1,
            order_type: OrderType::Immediate,
            fulfillment: Fulfillment::Pickup,
            scheduled_at: None,
            status: OrderStatus::Pending,
            customer_id: customer_id.to_string(),
            customer_name: "Ana".to_string(),
            customer_phone: "09171234567".to_string(),
            delivery_address: None,
            coordinates: None,
            items: vec![OrderLineItem {
                menu_item_id: "adobo".to_string(),
                name: "Chicken Adobo".to_string(),
                unit_price: 100.0,
                quantity: 1,
                variant: None,
                selected_choices: Default::default(),
                line_total: 100.0,
            }],
            subtotal: 100.0,
            platform_fee: 10.0,
            delivery_fee: 0.0,
            discount: 0.0,
            total: 110.0,
            voucher_code: None,
            payment_plan: PaymentPlan::Full,
            downpayment_amount: None,
            remaining_payment_method: None,
            payment_proof_url: "proof".to_string(),
            remaining_payment_proof_url: None,
            denial_reason: None,
            allow_chat: true,
            allow_customer_images: false,
            estimated_prep_minutes: None,
            note: None,
        }
    }

    #[test]
    fn test_store_and_get_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order = sample("o1", "c1");

        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &order).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_order("o1").unwrap(), Some(order));
        assert_eq!(storage.get_order("missing").unwrap(), None);
    }

    #[test]
    fn test_customer_index() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &sample("o1", "c1")).unwrap();
        storage.store_order(&txn, &sample("o2", "c1")).unwrap();
        storage.store_order(&txn, &sample("o3", "c2")).unwrap();
        txn.commit().unwrap();

        let mut ids: Vec<String> = storage
            .get_orders_for_customer("c1")
            .unwrap()
            .into_iter()
            .map(|o| o.order_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["o1", "o2"]);
        assert_eq!(storage.get_all_orders().unwrap().len(), 3);
    }

    #[test]
    fn test_rewrite_does_not_duplicate_index() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let mut order = sample("o1", "c1");

        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &order).unwrap();
        txn.commit().unwrap();

        order.status = OrderStatus::Accepted;
        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &order).unwrap();
        txn.commit().unwrap();

        let orders = storage.get_orders_for_customer("c1").unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Accepted);
    }

    #[test]
    fn test_order_counter() {
        let storage = OrderStorage::open_in_memory().unwrap();
        assert_eq!(storage.get_order_count().unwrap(), 0);
        assert_eq!(storage.next_order_count().unwrap(), 1);
        assert_eq!(storage.next_order_count().unwrap(), 2);
        assert_eq!(storage.get_order_count().unwrap(), 2);
    }

    #[test]
    fn test_counter_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.redb");
        {
            let storage = OrderStorage::open(&path).unwrap();
            storage.next_order_count().unwrap();
            storage.next_order_count().unwrap();
        }
        let storage = OrderStorage::open(&path).unwrap();
        assert_eq!(storage.next_order_count().unwrap(), 3);
    }
}

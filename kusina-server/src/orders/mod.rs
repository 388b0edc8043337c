//! Orders module - order aggregate store
//!
//! - [`storage`]: redb persistence (orders, customer index, receipt counter)
//! - [`manager`]: `OrdersManager`, the only writer of orders

pub mod manager;
pub mod storage;

pub use manager::{ManagerError, ManagerResult, OrderSettings, OrdersManager, PendingGate};
pub use storage::{OrderStorage, StorageError, StorageResult};

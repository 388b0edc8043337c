//! Data models
//!
//! Shared between kusina-server and clients (via API).

pub mod role;
pub mod voucher;

// Re-exports
pub use role::*;
pub use voucher::*;

//! Shared types for Kusina
//!
//! Domain types and pure order logic used by the server and by any client
//! that wants to derive the same views locally: the order model and its
//! status machine, the payment plan resolver, the active-order selectors,
//! the filter/sort engine, chat messages, vouchers and the unified error
//! types.

pub mod chat;
pub mod error;
pub mod message;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{BusMessage, BusPayload};

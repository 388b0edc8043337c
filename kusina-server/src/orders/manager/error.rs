use super::super::storage::StorageError;
use crate::services::{CatalogError, VoucherError};
use shared::error::{AppError, ErrorCode};
use shared::order::{OrderStatus, PaymentError, TransitionError};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {0} belongs to another customer")]
    NotOrderOwner(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid order: {0}")]
    InvalidDraft(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Voucher(#[from] VoucherError),

    #[error("Voucher cannot be applied: {0}")]
    VoucherRejected(String),

    #[error("Delivery address is required for delivery orders")]
    AddressRequired,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid payment plan: {0}")]
    Payment(#[from] PaymentError),

    #[error("Payment proof is required")]
    PaymentProofRequired,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Customer already has a pending order: {0}")]
    ActiveOrderExists(String),

    #[error("Order status is {actual}, expected {expected}")]
    StatusConflict {
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("Order can no longer be cancelled (status: {0})")]
    NotCancellable(OrderStatus),

    #[error("Amount invariant violated: {0}")]
    AmountInvariant(String),
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Storage(e) => {
                let code = e.error_code();
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            ManagerError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {}", id))
                    .with_detail("order_id", id)
            }
            ManagerError::NotOrderOwner(id) => AppError::not_order_owner(id),
            ManagerError::PermissionDenied(msg) => AppError::permission_denied(msg),
            ManagerError::InvalidDraft(errors) => crate::utils::error::from_validation_errors(errors),
            ManagerError::Validation(msg) => AppError::validation(msg),
            ManagerError::Catalog(e) => e.into(),
            ManagerError::Voucher(e) => e.into(),
            ManagerError::VoucherRejected(msg) => {
                AppError::with_message(ErrorCode::VoucherInvalid, msg)
            }
            e @ ManagerError::AddressRequired => {
                AppError::with_message(ErrorCode::AddressRequired, e.to_string())
            }
            e @ ManagerError::InvalidSchedule(_) => {
                AppError::with_message(ErrorCode::InvalidSchedule, e.to_string())
            }
            ManagerError::Payment(e) => {
                let code = match &e {
                    PaymentError::ProofNotRequired => ErrorCode::ProofNotRequired,
                    PaymentError::ProofAlreadyUploaded => ErrorCode::ProofAlreadyUploaded,
                    _ => ErrorCode::InvalidPaymentPlan,
                };
                AppError::with_message(code, e.to_string())
            }
            e @ ManagerError::PaymentProofRequired => {
                AppError::with_message(ErrorCode::PaymentProofRequired, e.to_string())
            }
            ManagerError::Transition(e) => {
                AppError::with_message(ErrorCode::InvalidTransition, e.to_string())
                    .with_detail("from", e.from.as_str())
                    .with_detail("to", e.to.as_str())
            }
            ManagerError::ActiveOrderExists(order_id) => AppError::with_message(
                ErrorCode::ActiveOrderExists,
                format!("Customer already has a pending order: {}", order_id),
            )
            .with_detail("order_id", order_id),
            ManagerError::StatusConflict { expected, actual } => AppError::with_message(
                ErrorCode::StatusConflict,
                format!("Order status is {}, expected {}", actual, expected),
            )
            .with_detail("expected", expected.as_str())
            .with_detail("actual", actual.as_str()),
            e @ ManagerError::NotCancellable(_) => {
                AppError::with_message(ErrorCode::OrderNotCancellable, e.to_string())
            }
            ManagerError::AmountInvariant(msg) => {
                tracing::error!(error = %msg, "Order amount invariant violated");
                AppError::with_message(ErrorCode::InvalidAmount, msg)
            }
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

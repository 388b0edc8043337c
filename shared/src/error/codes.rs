//! Unified error codes for Kusina
//!
//! This module defines all error codes returned by the server and understood
//! by clients. Error codes are organized by category:
//! - 0xxx: General / validation errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Chat errors (65xx: file upload)
//! - 7xxx: Voucher errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Order belongs to another customer
    NotOrderOwner = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order amount invalid
    InvalidAmount = 4004,
    /// Status transition not allowed from the current status
    InvalidTransition = 4005,
    /// Customer already has a pending order
    ActiveOrderExists = 4006,
    /// Stored status differs from the expected status (stale client)
    StatusConflict = 4007,
    /// Order cannot be cancelled by the customer
    OrderNotCancellable = 4008,
    /// Menu item not found in the catalog
    MenuItemNotFound = 4009,
    /// Delivery address required
    AddressRequired = 4010,
    /// Pre-order schedule invalid
    InvalidSchedule = 4011,

    // ==================== 5xxx: Payment ====================
    /// Payment plan fields are inconsistent
    InvalidPaymentPlan = 5001,
    /// Payment proof missing
    PaymentProofRequired = 5002,
    /// Order does not need a remaining-balance proof
    ProofNotRequired = 5003,
    /// No staged proof exists for the order
    NoStagedProof = 5004,
    /// Remaining-balance proof already uploaded
    ProofAlreadyUploaded = 5005,

    // ==================== 6xxx: Chat ====================
    /// Chat is closed for this order
    ChatClosed = 6001,
    /// Customer images are not allowed in this chat
    ImagesNotAllowed = 6002,
    /// Message body empty or too long
    InvalidMessage = 6003,

    // ==================== 65xx: File Upload ====================
    /// File too large
    FileTooLarge = 6501,
    /// Unsupported file format
    UnsupportedFileFormat = 6502,
    /// Empty file
    EmptyFile = 6505,
    /// Upload token unknown or already used
    UploadTokenInvalid = 6506,
    /// File storage failed
    FileStorageFailed = 6509,

    // ==================== 7xxx: Voucher ====================
    /// Voucher code not found
    VoucherNotFound = 7001,
    /// Voucher code rejected (inactive, expired, exhausted, minimum not met)
    VoucherInvalid = 7002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,

    // ==================== 94xx: Storage ====================
    /// Disk full
    StorageFull = 9401,
    /// Storage corrupted
    StorageCorrupted = 9403,
    /// System busy, retry later
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether the client should offer a retry (transient I/O failure)
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::TimeoutError
                | ErrorCode::SystemBusy
                | ErrorCode::FileStorageFailed
        )
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::NotOrderOwner => "Order belongs to another customer",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidAmount => "Invalid amount",
            ErrorCode::InvalidTransition => "Status change is not allowed for this order",
            ErrorCode::ActiveOrderExists => "You already have a pending order",
            ErrorCode::StatusConflict => "Order status changed, please refresh",
            ErrorCode::OrderNotCancellable => "Order can no longer be cancelled",
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::AddressRequired => "Delivery address is required",
            ErrorCode::InvalidSchedule => "Pre-order schedule must be in the future",

            // Payment
            ErrorCode::InvalidPaymentPlan => "Invalid payment plan",
            ErrorCode::PaymentProofRequired => "Payment proof is required",
            ErrorCode::ProofNotRequired => "Order does not need a remaining payment proof",
            ErrorCode::NoStagedProof => "No staged payment proof for this order",
            ErrorCode::ProofAlreadyUploaded => "Remaining payment proof already uploaded",

            // Chat
            ErrorCode::ChatClosed => "Chat is closed for this order",
            ErrorCode::ImagesNotAllowed => "Images are not allowed in this chat",
            ErrorCode::InvalidMessage => "Message is empty or too long",

            // File Upload
            ErrorCode::FileTooLarge => "File too large",
            ErrorCode::UnsupportedFileFormat => "Unsupported file format",
            ErrorCode::EmptyFile => "Empty file provided",
            ErrorCode::UploadTokenInvalid => "Upload link is invalid or already used",
            ErrorCode::FileStorageFailed => "File storage failed",

            // Voucher
            ErrorCode::VoucherNotFound => "Voucher not found",
            ErrorCode::VoucherInvalid => "Voucher cannot be applied",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",

            // Storage
            ErrorCode::StorageFull => "Storage full (disk space insufficient)",
            ErrorCode::StorageCorrupted => "Storage corrupted (data file damaged)",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::NotOrderOwner),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4004 => Ok(ErrorCode::InvalidAmount),
            4005 => Ok(ErrorCode::InvalidTransition),
            4006 => Ok(ErrorCode::ActiveOrderExists),
            4007 => Ok(ErrorCode::StatusConflict),
            4008 => Ok(ErrorCode::OrderNotCancellable),
            4009 => Ok(ErrorCode::MenuItemNotFound),
            4010 => Ok(ErrorCode::AddressRequired),
            4011 => Ok(ErrorCode::InvalidSchedule),

            // Payment
            5001 => Ok(ErrorCode::InvalidPaymentPlan),
            5002 => Ok(ErrorCode::PaymentProofRequired),
            5003 => Ok(ErrorCode::ProofNotRequired),
            5004 => Ok(ErrorCode::NoStagedProof),
            5005 => Ok(ErrorCode::ProofAlreadyUploaded),

            // Chat
            6001 => Ok(ErrorCode::ChatClosed),
            6002 => Ok(ErrorCode::ImagesNotAllowed),
            6003 => Ok(ErrorCode::InvalidMessage),

            // File Upload
            6501 => Ok(ErrorCode::FileTooLarge),
            6502 => Ok(ErrorCode::UnsupportedFileFormat),
            6505 => Ok(ErrorCode::EmptyFile),
            6506 => Ok(ErrorCode::UploadTokenInvalid),
            6509 => Ok(ErrorCode::FileStorageFailed),

            // Voucher
            7001 => Ok(ErrorCode::VoucherNotFound),
            7002 => Ok(ErrorCode::VoucherInvalid),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            // Storage
            9401 => Ok(ErrorCode::StorageFull),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

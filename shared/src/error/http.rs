//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::MenuItemNotFound
            | Self::VoucherNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict (precondition on current state)
            Self::InvalidTransition
            | Self::ActiveOrderExists
            | Self::StatusConflict
            | Self::OrderNotCancellable
            | Self::ProofAlreadyUploaded
            | Self::ChatClosed => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied
            | Self::NotOrderOwner
            | Self::ImagesNotAllowed => StatusCode::FORBIDDEN,

            // 413 Payload Too Large
            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // 422 Unprocessable (business precondition on payment/voucher)
            Self::ProofNotRequired | Self::NoStagedProof | Self::VoucherInvalid => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 503 Service Unavailable (transient errors, client can retry)
            Self::TimeoutError
            | Self::SystemBusy
            | Self::FileStorageFailed => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::ConfigError
            | Self::StorageFull
            | Self::StorageCorrupted => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

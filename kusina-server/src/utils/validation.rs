//! Input validation helpers
//!
//! Text limits for the fields `validator` derives cannot check on their own
//! (patch fields, query strings).

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Denial reasons
pub const MAX_NOTE_LEN: usize = 500;

/// Inquiry body
pub const MAX_INQUIRY_LEN: usize = 2000;

/// URLs / blob references
pub const MAX_URL_LEN: usize = 512;

/// Addresses
pub const MAX_ADDRESS_LEN: usize = 300;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        )));
    }
    Ok(())
}

//! Voucher Model

use crate::order::money::{to_decimal, to_f64};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherType {
    /// `value` is a percentage (0-100)
    Percentage,
    /// `value` is an amount
    Fixed,
}

/// Voucher code charset: ASCII letters, digits, `_` and `-`
pub fn validate_code_charset(code: &str) -> Result<(), ValidationError> {
    if code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::new("voucher_code_charset"))
    }
}

/// Voucher code as typed by a customer (format check only)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VoucherCode {
    #[validate(length(min = 3, max = 50), custom(function = "validate_code_charset"))]
    pub code: String,
}

impl VoucherCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into().trim().to_string(),
        }
    }

    /// Codes are matched case-insensitively
    pub fn normalized(&self) -> String {
        self.code.to_ascii_uppercase()
    }
}

/// Voucher entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Voucher {
    #[validate(length(min = 3, max = 50), custom(function = "validate_code_charset"))]
    pub code: String,
    pub voucher_type: VoucherType,
    #[validate(range(min = 0.0))]
    pub value: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub min_order_amount: f64,
    #[serde(default)]
    pub max_discount: Option<f64>,
    /// Unix millis
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Result of checking a voucher against an order amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherValidation {
    pub valid: bool,
    pub discount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VoucherValidation {
    pub fn valid(discount: f64) -> Self {
        Self {
            valid: true,
            discount,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount: 0.0,
            message: Some(message.into()),
        }
    }
}

impl Voucher {
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
    }

    /// Check the voucher against `order_amount` at time `now`
    ///
    /// The minimum order amount is inclusive. The discount never exceeds
    /// the order amount.
    pub fn evaluate(&self, order_amount: f64, now: i64) -> VoucherValidation {
        if !self.active {
            return VoucherValidation::invalid("Voucher is not active");
        }
        if self.expires_at.is_some_and(|exp| now >= exp) {
            return VoucherValidation::invalid("Voucher has expired");
        }
        if self.is_exhausted() {
            return VoucherValidation::invalid("Voucher usage limit reached");
        }

        let amount = to_decimal(order_amount);
        let minimum = to_decimal(self.min_order_amount);
        if amount < minimum {
            return VoucherValidation::invalid(format!(
                "Minimum order amount is {:.2}",
                self.min_order_amount
            ));
        }

        let value = to_decimal(self.value);
        let mut discount = match self.voucher_type {
            VoucherType::Percentage => amount * value / Decimal::ONE_HUNDRED,
            VoucherType::Fixed => value,
        };
        if let Some(cap) = self.max_discount
            && self.voucher_type == VoucherType::Percentage
        {
            discount = discount.min(to_decimal(cap));
        }
        let discount = discount.max(Decimal::ZERO).min(amount);

        VoucherValidation::valid(to_f64(discount))
    }
}

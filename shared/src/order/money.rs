//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored and serialized as `f64`; every computation goes
//! through `Decimal` and is rounded back to 2 decimal places.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed unit price (₱1,000,000)
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round an f64 amount to 2 decimal places
#[inline]
pub fn round_money(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Monetary equality within [`MONEY_TOLERANCE`]
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}

/// Finite, non-negative and below [`MAX_PRICE`]
pub fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0 && value <= MAX_PRICE
}

/// Line total = unit price × quantity
pub fn line_total(unit_price: f64, quantity: u32) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Computed order amounts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub platform_fee: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub total: f64,
}

/// total = subtotal + platform fee + delivery fee − discount
///
/// The discount is clamped to `[0, subtotal + fees]`, so the total is never
/// negative.
pub fn compute_totals(
    line_totals: impl IntoIterator<Item = f64>,
    platform_fee: f64,
    delivery_fee: f64,
    discount: f64,
) -> Totals {
    let subtotal: Decimal = line_totals.into_iter().map(to_decimal).sum();
    let platform_fee = to_decimal(platform_fee).max(Decimal::ZERO);
    let delivery_fee = to_decimal(delivery_fee).max(Decimal::ZERO);
    let gross = subtotal + platform_fee + delivery_fee;
    let discount = to_decimal(discount).max(Decimal::ZERO).min(gross);

    Totals {
        subtotal: to_f64(subtotal),
        platform_fee: to_f64(platform_fee),
        delivery_fee: to_f64(delivery_fee),
        discount: to_f64(discount),
        total: to_f64(gross - discount),
    }
}

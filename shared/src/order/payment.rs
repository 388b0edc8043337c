//! Payment plan resolver
//!
//! Decides what an order's payment plan demands: how much is due now, what
//! balance remains, and which proof images are still missing.

use super::model::Order;
use super::money::{money_eq, round_money, to_decimal, to_f64};
use super::status::OrderStatus;
use super::types::{PaymentPlan, RemainingPaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default share of the total paid up front on a downpayment plan
pub const DEFAULT_DOWNPAYMENT_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentError {
    #[error("full payment must not carry downpayment fields")]
    UnexpectedDownpaymentFields,

    #[error("downpayment amount is required")]
    MissingDownpaymentAmount,

    #[error("downpayment {amount} must be greater than 0 and less than total {total}")]
    DownpaymentOutOfRange { amount: f64, total: f64 },

    #[error("remaining payment method is required for a downpayment")]
    MissingRemainingMethod,

    #[error("order does not need a remaining payment proof")]
    ProofNotRequired,

    #[error("remaining payment proof already uploaded")]
    ProofAlreadyUploaded,
}

/// Proof image an order may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    /// Uploaded at checkout
    Initial,
    /// Balance of an online downpayment
    Remaining,
}

/// Payment view derived from an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub plan: PaymentPlan,
    pub total: f64,
    pub amount_due_now: f64,
    pub remaining_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_payment_method: Option<RemainingPaymentMethod>,
    pub required_proofs: Vec<ProofKind>,
    pub missing_proofs: Vec<ProofKind>,
    pub needs_remaining_upload: bool,
    pub is_payment_complete: bool,
}

/// Validate plan fields against the order total
///
/// Returns the downpayment rounded to cents. The bound `0 < amount < total`
/// is checked on the rounded value, so `0.001` is rejected.
pub fn validate_plan(
    plan: PaymentPlan,
    total: f64,
    downpayment_amount: Option<f64>,
    remaining_method: Option<RemainingPaymentMethod>,
) -> Result<Option<f64>, PaymentError> {
    match plan {
        PaymentPlan::Full => {
            if downpayment_amount.is_some() || remaining_method.is_some() {
                return Err(PaymentError::UnexpectedDownpaymentFields);
            }
            Ok(None)
        }
        PaymentPlan::Downpayment => {
            let raw = downpayment_amount.ok_or(PaymentError::MissingDownpaymentAmount)?;
            if !raw.is_finite() {
                return Err(PaymentError::DownpaymentOutOfRange { amount: raw, total });
            }
            let amount = round_money(raw);
            if amount <= 0.0 || amount >= total || money_eq(amount, total) {
                return Err(PaymentError::DownpaymentOutOfRange { amount: raw, total });
            }
            if remaining_method.is_none() {
                return Err(PaymentError::MissingRemainingMethod);
            }
            Ok(Some(amount))
        }
    }
}

/// `total × ratio`, rounded to 2 decimal places
///
/// Ratios outside (0, 1) fall back to [`DEFAULT_DOWNPAYMENT_RATIO`].
pub fn default_downpayment(total: f64, ratio: f64) -> f64 {
    let ratio = if ratio.is_finite() && ratio > 0.0 && ratio < 1.0 {
        ratio
    } else {
        DEFAULT_DOWNPAYMENT_RATIO
    };
    to_f64(to_decimal(total) * to_decimal(ratio))
}

fn has_proof(url: Option<&str>) -> bool {
    url.is_some_and(|u| !u.trim().is_empty())
}

/// Derive the payment view of an order
pub fn resolve(order: &Order) -> PaymentStatus {
    let total = to_decimal(order.total);
    let initial_present = has_proof(Some(&order.payment_proof_url));
    let remaining_present = has_proof(order.remaining_payment_proof_url.as_deref());

    let (amount_due_now, remaining_balance, required_proofs) = match order.payment_plan {
        PaymentPlan::Full => (total, Decimal::ZERO, vec![ProofKind::Initial]),
        PaymentPlan::Downpayment => {
            let down = order.downpayment_amount.map(to_decimal).unwrap_or(total);
            let remaining = (total - down).max(Decimal::ZERO);
            let proofs = match order.remaining_payment_method {
                Some(RemainingPaymentMethod::Online) => {
                    vec![ProofKind::Initial, ProofKind::Remaining]
                }
                _ => vec![ProofKind::Initial],
            };
            (down, remaining, proofs)
        }
    };

    let missing_proofs: Vec<ProofKind> = required_proofs
        .iter()
        .copied()
        .filter(|kind| match kind {
            ProofKind::Initial => !initial_present,
            ProofKind::Remaining => !remaining_present,
        })
        .collect();

    let needs_remaining_upload = missing_proofs.contains(&ProofKind::Remaining);

    // Cash balances are settled at handover
    let cash_settled = match (order.payment_plan, order.remaining_payment_method) {
        (PaymentPlan::Downpayment, Some(RemainingPaymentMethod::Cash)) => {
            matches!(order.status, OrderStatus::Completed | OrderStatus::Delivered)
        }
        _ => true,
    };

    PaymentStatus {
        plan: order.payment_plan,
        total: to_f64(total),
        amount_due_now: to_f64(amount_due_now),
        remaining_balance: to_f64(remaining_balance),
        remaining_payment_method: order.remaining_payment_method,
        is_payment_complete: missing_proofs.is_empty() && cash_settled,
        required_proofs,
        missing_proofs,
        needs_remaining_upload,
    }
}

/// Whether a remaining-balance proof may be attached to this order now
pub fn check_remaining_proof_allowed(order: &Order) -> Result<(), PaymentError> {
    let status = resolve(order);
    if !status.required_proofs.contains(&ProofKind::Remaining) {
        return Err(PaymentError::ProofNotRequired);
    }
    if !status.needs_remaining_upload {
        return Err(PaymentError::ProofAlreadyUploaded);
    }
    Ok(())
}

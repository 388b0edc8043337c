//! Order aggregate

use super::money::{MONEY_TOLERANCE, money_eq, to_decimal};
use super::status::OrderStatus;
use super::types::{
    Fulfillment, GeoPoint, OrderLineItem, OrderType, PaymentPlan, RemainingPaymentMethod,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stored order
///
/// Created by checkout, mutated only through the store, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// UUID v4
    pub order_id: String,
    /// Receipt number, e.g. `KSN2026101810001`
    pub order_number: String,
    /// Unix millis, authoritative for ordering
    pub created_at: i64,
    pub updated_at: i64,

    pub order_type: OrderType,
    pub fulfillment: Fulfillment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<i64>,
    pub status: OrderStatus,

    // === Customer ===
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,

    pub items: Vec<OrderLineItem>,

    // === Money ===
    pub subtotal: f64,
    pub platform_fee: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,

    // === Payment ===
    pub payment_plan: PaymentPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downpayment_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_payment_method: Option<RemainingPaymentMethod>,
    pub payment_proof_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_payment_proof_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,

    // === Chat gating ===
    #[serde(default = "default_true")]
    pub allow_chat: bool,
    #[serde(default)]
    pub allow_customer_images: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_prep_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Order {
    pub fn is_owned_by(&self, customer_id: &str) -> bool {
        self.customer_id == customer_id
    }

    pub fn is_pre_order(&self) -> bool {
        self.order_type == OrderType::PreOrder
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active_for(self.order_type)
    }

    /// Prep estimate, hidden once the order is ready
    pub fn visible_prep_minutes(&self) -> Option<u32> {
        if self.status.shows_prep_time() {
            self.estimated_prep_minutes
        } else {
            None
        }
    }

    /// Check the stored monetary invariants
    ///
    /// `total == subtotal + platform_fee + delivery_fee - discount`,
    /// `total >= 0`, and the subtotal matches the line totals.
    pub fn verify_amounts(&self) -> Result<(), String> {
        let lines: Decimal = self.items.iter().map(|i| to_decimal(i.line_total)).sum();
        if (lines - to_decimal(self.subtotal)).abs() >= MONEY_TOLERANCE {
            return Err(format!(
                "subtotal {} does not match line totals {}",
                self.subtotal, lines
            ));
        }

        let expected = to_decimal(self.subtotal) + to_decimal(self.platform_fee)
            + to_decimal(self.delivery_fee)
            - to_decimal(self.discount);
        if (expected - to_decimal(self.total)).abs() >= MONEY_TOLERANCE {
            return Err(format!(
                "total {} does not equal subtotal + fees - discount ({})",
                self.total, expected
            ));
        }

        if self.total < 0.0 || self.discount < 0.0 {
            return Err(format!(
                "negative amount: total {}, discount {}",
                self.total, self.discount
            ));
        }

        if let Some(amount) = self.downpayment_amount
            && (amount <= 0.0 || amount >= self.total || money_eq(amount, self.total))
        {
            return Err(format!(
                "downpayment {} must be between 0 and total {}",
                amount, self.total
            ));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::order;
    use super::*;

    #[test]
    fn test_verify_amounts_ok() {
        let o = order("o1", "c1", 0, OrderStatus::Pending);
        assert!(o.verify_amounts().is_ok());
    }

    #[test]
    fn test_verify_amounts_rejects_bad_total() {
        let mut o = order("o1", "c1", 0, OrderStatus::Pending);
        o.total = 120.0;
        assert!(o.verify_amounts().is_err());
    }

    #[test]
    fn test_verify_amounts_rejects_bad_downpayment() {
        let mut o = order("o1", "c1", 0, OrderStatus::Pending);
        o.payment_plan = PaymentPlan::Downpayment;
        o.downpayment_amount = Some(110.0);
        assert!(o.verify_amounts().is_err());
        o.downpayment_amount = Some(55.0);
        assert!(o.verify_amounts().is_ok());
    }

    #[test]
    fn test_visible_prep_minutes() {
        let mut o = order("o1", "c1", 0, OrderStatus::Accepted);
        o.estimated_prep_minutes = Some(20);
        assert_eq!(o.visible_prep_minutes(), Some(20));
        o.status = OrderStatus::Ready;
        assert_eq!(o.visible_prep_minutes(), None);
    }

    #[test]
    fn test_allow_chat_defaults_true_on_old_records() {
        let o = order("o1", "c1", 0, OrderStatus::Pending);
        let mut value = serde_json::to_value(&o).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("allow_chat");
        obj.remove("allow_customer_images");
        let back: Order = serde_json::from_value(value).unwrap();
        assert!(back.allow_chat);
        assert!(!back.allow_customer_images);
    }
}

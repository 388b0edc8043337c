//! Order value types shared by checkout, the store and clients

use super::status::OrderStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

// ============================================================================
// Enums
// ============================================================================

/// Immediate order or scheduled pre-order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    #[default]
    Immediate,
    PreOrder,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Immediate => "immediate",
            OrderType::PreOrder => "pre-order",
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(OrderType::Immediate),
            "pre-order" => Ok(OrderType::PreOrder),
            other => Err(format!("unknown order type: {other}")),
        }
    }
}

/// 取餐方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Fulfillment {
    #[default]
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPlan {
    #[default]
    Full,
    Downpayment,
}

/// How the balance of a downpayment order is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainingPaymentMethod {
    /// Paid in person, no second proof
    Cash,
    /// Second payment proof upload
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

// ============================================================================
// Line items
// ============================================================================

/// Priced line stored on the order (prices come from the catalog)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// choice group name -> choice name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selected_choices: BTreeMap<String, String>,
    pub line_total: f64,
}

/// Cart line submitted at checkout
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DraftItem {
    #[validate(length(min = 1, max = 64))]
    pub menu_item_id: String,
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub selected_choices: BTreeMap<String, String>,
    /// Price the client displayed; advisory only
    #[serde(default)]
    pub unit_price: Option<f64>,
}

// ============================================================================
// Commands
// ============================================================================

/// Checkout payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderDraft {
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub fulfillment: Fulfillment,
    /// Required for pre-orders, Unix millis
    #[serde(default)]
    pub scheduled_at: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub customer_name: String,
    #[validate(length(min = 5, max = 20))]
    pub customer_phone: String,
    #[serde(default)]
    #[validate(length(max = 300))]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    #[validate(length(min = 1), nested)]
    pub items: Vec<DraftItem>,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub payment_plan: PaymentPlan,
    #[serde(default)]
    pub downpayment_amount: Option<f64>,
    #[serde(default)]
    pub remaining_payment_method: Option<RemainingPaymentMethod>,
    /// Blob storage id or URL of the initial payment proof
    #[validate(length(min = 1, max = 512))]
    pub payment_proof_url: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Total the client displayed; advisory only
    #[serde(default)]
    pub client_total: Option<f64>,
}

/// Partial update applied through the store
///
/// Monetary fields are not patchable once an order exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Compare-and-swap guard on the stored status
    #[serde(default)]
    pub expected_status: Option<OrderStatus>,
    #[serde(default)]
    pub denial_reason: Option<String>,
    #[serde(default)]
    pub estimated_prep_minutes: Option<u32>,
    #[serde(default)]
    pub allow_chat: Option<bool>,
    #[serde(default)]
    pub allow_customer_images: Option<bool>,
    #[serde(default)]
    pub remaining_payment_proof_url: Option<String>,
}

impl OrderPatch {
    pub fn status(to: OrderStatus) -> Self {
        Self {
            status: Some(to),
            ..Default::default()
        }
    }

    pub fn expecting(mut self, from: OrderStatus) -> Self {
        self.expected_status = Some(from);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.denial_reason.is_none()
            && self.estimated_prep_minutes.is_none()
            && self.allow_chat.is_none()
            && self.allow_customer_images.is_none()
            && self.remaining_payment_proof_url.is_none()
    }

    /// Touches fields only the restaurant side may change
    pub fn touches_restaurant_fields(&self) -> bool {
        self.denial_reason.is_some()
            || self.estimated_prep_minutes.is_some()
            || self.allow_chat.is_some()
            || self.allow_customer_images.is_some()
    }
}

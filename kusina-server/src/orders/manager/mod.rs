//! OrdersManager - the only writer of orders
//!
//! Every mutation re-reads the stored order inside a redb write transaction
//! and checks it there, so two racing updates cannot both pass a check
//! against the same stale status. redb serializes writers.
//!
//! # Write Flow
//!
//! ```text
//! create_order(actor, draft) / update_order(actor, id, patch)
//!     ├─ 1. Validate input (outside the transaction)
//!     ├─ 2. Pre-generate receipt number (create only, own transaction)
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Re-read stored state (pending gate / current order)
//!     ├─ 5. Authorize, check transition and invariants
//!     ├─ 6. Persist and commit
//!     └─ 7. Broadcast OrderUpdated
//! ```

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::storage::{OrderStorage, StorageError};
use crate::auth::CurrentUser;
use crate::message::MessageBus;
use crate::services::{
    Catalog, DeliveryFeeLookup, InMemoryCatalog, Menu, VoucherRegistry, VoucherValidator,
    ZoneFeeTable,
};
use crate::utils::time::receipt_date;
use crate::utils::validation::{MAX_NOTE_LEN, MAX_URL_LEN};
use chrono_tz::Tz;
use serde::Serialize;
use shared::message::BusMessage;
use shared::order::money::{compute_totals, line_total, money_eq, to_decimal, to_f64};
use shared::order::payment::{self, PaymentStatus};
use shared::order::selector;
use shared::order::{
    ActorSide, Fulfillment, Order, OrderDraft, OrderFilter, OrderLineItem, OrderPatch,
    OrderStatus, OrderType, PaymentPlan, filter_and_sort_orders, transition_allowed,
};
use std::sync::Arc;
use validator::Validate;

/// Upper bound for the prep-time estimate
const MAX_PREP_MINUTES: u32 = 600;

/// Pricing and calendar settings taken from [`crate::Config`]
#[derive(Debug, Clone, Copy)]
pub struct OrderSettings {
    pub platform_fee: f64,
    pub downpayment_ratio: f64,
    /// 业务时区
    pub tz: Tz,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            platform_fee: 10.0,
            downpayment_ratio: payment::DEFAULT_DOWNPAYMENT_RATIO,
            tz: chrono_tz::Asia::Manila,
        }
    }
}

/// Single-pending-order gate for one customer
#[derive(Debug, Clone, Serialize)]
pub struct PendingGate {
    pub has_active_pending: bool,
    /// The order that blocks checkout, newest first
    pub order: Option<Order>,
}

pub struct OrdersManager {
    storage: OrderStorage,
    bus: MessageBus,
    settings: OrderSettings,
    catalog: Arc<dyn Catalog>,
    vouchers: Arc<dyn VoucherValidator>,
    delivery_fees: Arc<dyn DeliveryFeeLookup>,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("bus", &"<MessageBus>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl OrdersManager {
    /// Create a manager over existing storage
    ///
    /// Starts with an empty catalog, no vouchers and no delivery zones; the
    /// server wires the real collaborators through the setters.
    pub fn new(storage: OrderStorage, bus: MessageBus, settings: OrderSettings) -> Self {
        Self {
            storage,
            bus,
            settings,
            catalog: Arc::new(InMemoryCatalog::new(Menu::default())),
            vouchers: Arc::new(VoucherRegistry::new()),
            delivery_fees: Arc::new(ZoneFeeTable::default()),
        }
    }

    /// Create an OrdersManager with existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(storage: OrderStorage) -> Self {
        let mut manager = Self::new(storage, MessageBus::new(), OrderSettings::default());
        manager.set_catalog(Arc::new(InMemoryCatalog::sample()));
        manager.set_delivery_fees(Arc::new(
            ZoneFeeTable::parse("makati=50").unwrap_or_default(),
        ));
        manager
    }

    pub fn set_catalog(&mut self, catalog: Arc<dyn Catalog>) {
        self.catalog = catalog;
    }

    pub fn set_vouchers(&mut self, vouchers: Arc<dyn VoucherValidator>) {
        self.vouchers = vouchers;
    }

    pub fn set_delivery_fees(&mut self, delivery_fees: Arc<dyn DeliveryFeeLookup>) {
        self.delivery_fees = delivery_fees;
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn settings(&self) -> &OrderSettings {
        &self.settings
    }

    /// Generate next receipt number (crash-safe via redb)
    fn next_receipt_number(&self, now: i64) -> ManagerResult<String> {
        let count = self.storage.next_order_count()?;
        Ok(format!(
            "KSN{}{}",
            receipt_date(now, self.settings.tz),
            10000 + count
        ))
    }

    fn broadcast(&self, order: &Order) {
        if self.bus.publish(BusMessage::order_updated(order)) == 0 {
            tracing::debug!(order_id = %order.order_id, "Order update not delivered: no active receivers");
        }
    }

    // ========== Commands ==========

    /// Checkout: validate, re-price, persist behind the pending-order gate
    pub fn create_order(&self, actor: &CurrentUser, draft: OrderDraft) -> ManagerResult<Order> {
        if !actor.is_customer() {
            return Err(ManagerError::PermissionDenied(
                "only customers can place orders".to_string(),
            ));
        }
        draft.validate()?;

        let now = shared::util::now_millis();

        let customer_name = draft.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(ManagerError::Validation(
                "customer_name must not be empty".to_string(),
            ));
        }
        let payment_proof_url = draft.payment_proof_url.trim().to_string();
        if payment_proof_url.is_empty() {
            return Err(ManagerError::PaymentProofRequired);
        }

        match (draft.order_type, draft.scheduled_at) {
            (OrderType::PreOrder, None) => {
                return Err(ManagerError::InvalidSchedule(
                    "pre-orders require scheduled_at".to_string(),
                ));
            }
            (OrderType::PreOrder, Some(at)) if at <= now => {
                return Err(ManagerError::InvalidSchedule(
                    "pre-orders must be scheduled in the future".to_string(),
                ));
            }
            (OrderType::Immediate, Some(_)) => {
                return Err(ManagerError::InvalidSchedule(
                    "immediate orders cannot be scheduled".to_string(),
                ));
            }
            _ => {}
        }

        let (delivery_address, coordinates) = match draft.fulfillment {
            Fulfillment::Delivery => {
                let address = draft
                    .delivery_address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .ok_or(ManagerError::AddressRequired)?;
                (Some(address.to_string()), draft.coordinates)
            }
            Fulfillment::Pickup => (None, None),
        };

        // Prices always come from the catalog
        let mut items = Vec::with_capacity(draft.items.len());
        for line in &draft.items {
            let priced = self.catalog.price_line(line)?;
            if let Some(client_price) = line.unit_price
                && !money_eq(client_price, priced.unit_price)
            {
                tracing::warn!(
                    menu_item_id = %line.menu_item_id,
                    client_price,
                    catalog_price = priced.unit_price,
                    "Client price differs from catalog, using catalog price"
                );
            }
            items.push(OrderLineItem {
                menu_item_id: line.menu_item_id.clone(),
                name: priced.name,
                unit_price: priced.unit_price,
                quantity: line.quantity,
                variant: line.variant.clone(),
                selected_choices: line.selected_choices.clone(),
                line_total: line_total(priced.unit_price, line.quantity),
            });
        }
        let subtotal = to_f64(items.iter().map(|i| to_decimal(i.line_total)).sum());

        let delivery_fee = delivery_address
            .as_deref()
            .map(|address| self.delivery_fees.fee_for(address))
            .unwrap_or(0.0);

        let voucher_code = draft
            .voucher_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let discount = match &voucher_code {
            Some(code) => {
                let validation = self.vouchers.validate(code, subtotal, now)?;
                if !validation.valid {
                    return Err(ManagerError::VoucherRejected(
                        validation
                            .message
                            .unwrap_or_else(|| "voucher is not valid".to_string()),
                    ));
                }
                validation.discount
            }
            None => 0.0,
        };

        let totals = compute_totals(
            items.iter().map(|i| i.line_total),
            self.settings.platform_fee,
            delivery_fee,
            discount,
        );
        if let Some(client_total) = draft.client_total
            && !money_eq(client_total, totals.total)
        {
            tracing::warn!(
                customer_id = %actor.id,
                client_total,
                server_total = totals.total,
                "Client total differs from server total"
            );
        }

        let downpayment_amount = match draft.payment_plan {
            PaymentPlan::Downpayment => Some(draft.downpayment_amount.unwrap_or_else(|| {
                payment::default_downpayment(totals.total, self.settings.downpayment_ratio)
            })),
            PaymentPlan::Full => draft.downpayment_amount,
        };
        // Stored rounded to cents
        let downpayment_amount = payment::validate_plan(
            draft.payment_plan,
            totals.total,
            downpayment_amount,
            draft.remaining_payment_method,
        )?;

        // Pre-check the gate so a rejected checkout does not burn a receipt number
        let existing = self.storage.get_orders_for_customer(&actor.id)?;
        if let Some(blocking) = selector::blocking_order(&existing, &actor.id) {
            return Err(ManagerError::ActiveOrderExists(blocking.order_id.clone()));
        }

        // redb doesn't allow nested write transactions
        let order_number = self.next_receipt_number(now)?;

        let order = Order {
            order_id: uuid::Uuid::new_v4().to_string(),
            order_number,
            created_at: now,
            updated_at: now,
            order_type: draft.order_type,
            fulfillment: draft.fulfillment,
            scheduled_at: draft.scheduled_at,
            status: OrderStatus::initial(draft.order_type),
            customer_id: actor.id.clone(),
            customer_name,
            customer_phone: draft.customer_phone.trim().to_string(),
            delivery_address,
            coordinates,
            items,
            subtotal: totals.subtotal,
            platform_fee: totals.platform_fee,
            delivery_fee: totals.delivery_fee,
            discount: totals.discount,
            total: totals.total,
            voucher_code,
            payment_plan: draft.payment_plan,
            downpayment_amount,
            remaining_payment_method: draft.remaining_payment_method,
            payment_proof_url,
            remaining_payment_proof_url: None,
            denial_reason: None,
            allow_chat: true,
            allow_customer_images: false,
            estimated_prep_minutes: None,
            note: draft
                .note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        };
        order.verify_amounts().map_err(ManagerError::AmountInvariant)?;

        // Reserve the voucher use before committing, give it back on failure
        if let Some(code) = &order.voucher_code {
            self.vouchers.redeem(code)?;
        }
        if let Err(e) = self.persist_new_order(&order) {
            if let Some(code) = &order.voucher_code {
                self.vouchers.release(code);
            }
            return Err(e);
        }

        tracing::info!(
            order_id = %order.order_id,
            order_number = %order.order_number,
            customer_id = %order.customer_id,
            order_type = order.order_type.as_str(),
            total = order.total,
            "Order created"
        );
        self.broadcast(&order);
        Ok(order)
    }

    fn persist_new_order(&self, order: &Order) -> ManagerResult<()> {
        let txn = self.storage.begin_write()?;
        // Double-check the gate within the transaction
        let stored = self
            .storage
            .get_orders_for_customer_txn(&txn, &order.customer_id)?;
        if let Some(blocking) = selector::blocking_order(&stored, &order.customer_id) {
            return Err(ManagerError::ActiveOrderExists(blocking.order_id.clone()));
        }
        self.storage.store_order(&txn, order)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }

    /// Apply a patch against the stored order
    pub fn update_order(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        patch: OrderPatch,
    ) -> ManagerResult<Order> {
        if patch.is_empty() {
            return Err(ManagerError::Validation(
                "patch does not change anything".to_string(),
            ));
        }

        let side = actor.role.side();
        match side {
            ActorSide::Customer if patch.touches_restaurant_fields() => {
                return Err(ManagerError::PermissionDenied(
                    "customers may only change status or the remaining payment proof".to_string(),
                ));
            }
            ActorSide::Restaurant if patch.remaining_payment_proof_url.is_some() => {
                return Err(ManagerError::PermissionDenied(
                    "payment proofs are uploaded by the customer".to_string(),
                ));
            }
            _ => {}
        }

        let now = shared::util::now_millis();

        let txn = self.storage.begin_write()?;
        let current = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))?;

        if side == ActorSide::Customer && !current.is_owned_by(&actor.id) {
            crate::security_log!(
                "WARN",
                "order_access_denied",
                user_id = actor.id.as_str(),
                order_id = order_id
            );
            return Err(ManagerError::NotOrderOwner(order_id.to_string()));
        }

        let updated = apply_patch(&current, &patch, side, now)?;
        self.storage.store_order(&txn, &updated)?;
        txn.commit().map_err(StorageError::from)?;

        if updated.status != current.status {
            tracing::info!(
                order_id = %order_id,
                from = current.status.as_str(),
                to = updated.status.as_str(),
                actor_id = %actor.id,
                role = actor.role.as_str(),
                "Order status changed"
            );
        } else {
            tracing::debug!(order_id = %order_id, actor_id = %actor.id, "Order updated");
        }
        self.broadcast(&updated);
        Ok(updated)
    }

    /// Customer cancels a pending order (or clears a denied one)
    pub fn cancel_order(&self, actor: &CurrentUser, order_id: &str) -> ManagerResult<Order> {
        self.update_order(actor, order_id, OrderPatch::status(OrderStatus::Cancelled))
    }

    /// "Confirm & clear" a denied order: `denied -> cancelled`, compare-and-swap
    pub fn confirm_denial(&self, actor: &CurrentUser, order_id: &str) -> ManagerResult<Order> {
        self.update_order(
            actor,
            order_id,
            OrderPatch::status(OrderStatus::Cancelled).expecting(OrderStatus::Denied),
        )
    }

    /// Restaurant moves an order forward
    pub fn set_status(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        status: OrderStatus,
    ) -> ManagerResult<Order> {
        if !actor.is_restaurant() {
            return Err(ManagerError::PermissionDenied(
                "only the restaurant can set order status".to_string(),
            ));
        }
        self.update_order(actor, order_id, OrderPatch::status(status))
    }

    /// Restaurant denies an order with a reason shown to the customer
    pub fn deny_order(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        reason: impl Into<String>,
    ) -> ManagerResult<Order> {
        let patch = OrderPatch {
            denial_reason: Some(reason.into()),
            ..OrderPatch::status(OrderStatus::Denied)
        };
        self.update_order(actor, order_id, patch)
    }

    /// Record the uploaded remaining-balance proof
    pub fn attach_remaining_proof(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        proof_url: impl Into<String>,
    ) -> ManagerResult<Order> {
        let patch = OrderPatch {
            remaining_payment_proof_url: Some(proof_url.into()),
            ..Default::default()
        };
        self.update_order(actor, order_id, patch)
    }

    // ========== Reads ==========

    pub fn get_order(&self, actor: &CurrentUser, order_id: &str) -> ManagerResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))?;
        if !actor.is_restaurant() && !order.is_owned_by(&actor.id) {
            return Err(ManagerError::NotOrderOwner(order_id.to_string()));
        }
        Ok(order)
    }

    /// Payment view of one order
    pub fn payment_status(&self, actor: &CurrentUser, order_id: &str) -> ManagerResult<PaymentStatus> {
        let order = self.get_order(actor, order_id)?;
        Ok(payment::resolve(&order))
    }

    /// A customer's orders, newest first
    pub fn list_orders_by_customer(
        &self,
        actor: &CurrentUser,
        customer_id: &str,
    ) -> ManagerResult<Vec<Order>> {
        let mut orders = self.customer_orders(actor, customer_id)?;
        orders.sort_by(selector::newest_first);
        Ok(orders)
    }

    /// Every order, newest first (restaurant only)
    pub fn list_all_orders(&self, actor: &CurrentUser) -> ManagerResult<Vec<Order>> {
        if !actor.is_restaurant() {
            return Err(ManagerError::PermissionDenied(
                "only the restaurant can list all orders".to_string(),
            ));
        }
        let mut orders = self.storage.get_all_orders()?;
        orders.sort_by(selector::newest_first);
        Ok(orders)
    }

    /// Filtered view: customers only ever see their own orders
    pub fn list_orders(
        &self,
        actor: &CurrentUser,
        mut filter: OrderFilter<'_>,
    ) -> ManagerResult<Vec<Order>> {
        let orders = if actor.is_restaurant() {
            match filter.customer_id.as_deref() {
                Some(customer_id) => self.storage.get_orders_for_customer(customer_id)?,
                None => self.storage.get_all_orders()?,
            }
        } else {
            filter.customer_id = Some(actor.id.clone());
            self.storage.get_orders_for_customer(&actor.id)?
        };

        Ok(filter_and_sort_orders(&orders, &filter, self.settings.tz)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get_active_pending_or_gate(
        &self,
        actor: &CurrentUser,
        customer_id: &str,
    ) -> ManagerResult<PendingGate> {
        let orders = self.customer_orders(actor, customer_id)?;
        Ok(PendingGate {
            has_active_pending: selector::has_active_pending(&orders, customer_id),
            order: selector::blocking_order(&orders, customer_id).cloned(),
        })
    }

    pub fn get_customer_active_order(
        &self,
        actor: &CurrentUser,
        customer_id: &str,
    ) -> ManagerResult<Option<Order>> {
        let orders = self.customer_orders(actor, customer_id)?;
        Ok(selector::customer_active_order(&orders, customer_id).cloned())
    }

    pub fn get_customer_active_orders(
        &self,
        actor: &CurrentUser,
        customer_id: &str,
    ) -> ManagerResult<Vec<Order>> {
        let orders = self.customer_orders(actor, customer_id)?;
        Ok(selector::customer_active_orders(&orders, customer_id)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get_customer_pre_orders(
        &self,
        actor: &CurrentUser,
        customer_id: &str,
    ) -> ManagerResult<Vec<Order>> {
        let orders = self.customer_orders(actor, customer_id)?;
        Ok(selector::customer_pre_orders(&orders, customer_id)
            .into_iter()
            .cloned()
            .collect())
    }

    fn customer_orders(&self, actor: &CurrentUser, customer_id: &str) -> ManagerResult<Vec<Order>> {
        if !actor.is_restaurant() && actor.id != customer_id {
            return Err(ManagerError::PermissionDenied(
                "customers can only view their own orders".to_string(),
            ));
        }
        Ok(self.storage.get_orders_for_customer(customer_id)?)
    }
}

/// Check a patch against the stored order and return the updated copy
fn apply_patch(
    current: &Order,
    patch: &OrderPatch,
    side: ActorSide,
    now: i64,
) -> ManagerResult<Order> {
    if let Some(expected) = patch.expected_status
        && expected != current.status
    {
        return Err(ManagerError::StatusConflict {
            expected,
            actual: current.status,
        });
    }

    let mut next = current.clone();

    if let Some(to) = patch.status {
        if side == ActorSide::Customer
            && to == OrderStatus::Cancelled
            && current.status != OrderStatus::Denied
            && !current.status.is_cancellable_by_customer()
        {
            return Err(ManagerError::NotCancellable(current.status));
        }
        transition_allowed(current.status, to, side, current.fulfillment)?;
        next.status = to;
    }

    let denying = patch.status == Some(OrderStatus::Denied);
    match (&patch.denial_reason, denying) {
        (Some(reason), true) => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(ManagerError::Validation(
                    "denial reason must not be empty".to_string(),
                ));
            }
            if reason.chars().count() > MAX_NOTE_LEN {
                return Err(ManagerError::Validation(format!(
                    "denial reason is too long (max {MAX_NOTE_LEN})"
                )));
            }
            next.denial_reason = Some(reason.to_string());
        }
        (Some(_), false) => {
            return Err(ManagerError::Validation(
                "denial reason can only be set when denying an order".to_string(),
            ));
        }
        (None, true) => {
            return Err(ManagerError::Validation(
                "denial reason is required".to_string(),
            ));
        }
        (None, false) => {}
    }

    if let Some(minutes) = patch.estimated_prep_minutes {
        if minutes == 0 || minutes > MAX_PREP_MINUTES {
            return Err(ManagerError::Validation(format!(
                "estimated prep time must be between 1 and {MAX_PREP_MINUTES} minutes"
            )));
        }
        if !next.status.shows_prep_time() {
            return Err(ManagerError::Validation(
                "prep time can only be set before the order is ready".to_string(),
            ));
        }
        next.estimated_prep_minutes = Some(minutes);
    }

    if let Some(allow) = patch.allow_chat {
        next.allow_chat = allow;
    }
    if let Some(allow) = patch.allow_customer_images {
        next.allow_customer_images = allow;
    }

    if let Some(url) = &patch.remaining_payment_proof_url {
        let url = url.trim();
        if url.is_empty() || url.chars().count() > MAX_URL_LEN {
            return Err(ManagerError::Validation(
                "remaining payment proof reference is invalid".to_string(),
            ));
        }
        if next.status == OrderStatus::Cancelled {
            return Err(ManagerError::Validation(
                "order is cancelled".to_string(),
            ));
        }
        payment::check_remaining_proof_allowed(current)?;
        next.remaining_payment_proof_url = Some(url.to_string());
    }

    next.updated_at = now.max(current.updated_at);
    next.verify_amounts().map_err(ManagerError::AmountInvariant)?;
    Ok(next)
}

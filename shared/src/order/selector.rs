//! Active / pending order selection
//!
//! Pure recomputation over a slice of orders. Callers re-run these on every
//! read instead of caching a flag.

use super::model::Order;
use std::cmp::Ordering;

/// Newest first; ties broken by order id (descending) so results are stable
pub fn newest_first(a: &Order, b: &Order) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.order_id.cmp(&a.order_id))
}

fn owned_by<'a, 'b>(
    orders: &'a [Order],
    customer_id: &'b str,
) -> impl Iterator<Item = &'a Order> + use<'a, 'b> {
    orders.iter().filter(move |o| o.is_owned_by(customer_id))
}

/// Customer has an order waiting on the restaurant (blocks checkout)
pub fn has_active_pending(orders: &[Order], customer_id: &str) -> bool {
    owned_by(orders, customer_id).any(|o| o.status.blocks_new_orders())
}

/// The pending order that blocks checkout, newest first
pub fn blocking_order<'a>(orders: &'a [Order], customer_id: &str) -> Option<&'a Order> {
    owned_by(orders, customer_id)
        .filter(|o| o.status.blocks_new_orders())
        .min_by(|a, b| newest_first(a, b))
}

/// Most recent order in ongoing fulfillment
pub fn customer_active_order<'a>(orders: &'a [Order], customer_id: &str) -> Option<&'a Order> {
    owned_by(orders, customer_id)
        .filter(|o| o.is_active())
        .min_by(|a, b| newest_first(a, b))
}

/// All orders in ongoing fulfillment, newest first
pub fn customer_active_orders<'a>(orders: &'a [Order], customer_id: &str) -> Vec<&'a Order> {
    let mut active: Vec<&Order> = owned_by(orders, customer_id)
        .filter(|o| o.is_active())
        .collect();
    active.sort_by(|a, b| newest_first(a, b));
    active
}

/// Pre-orders that are not yet finished, newest first
pub fn customer_pre_orders<'a>(orders: &'a [Order], customer_id: &str) -> Vec<&'a Order> {
    let mut pre: Vec<&Order> = owned_by(orders, customer_id)
        .filter(|o| o.is_pre_order() && !o.status.is_terminal())
        .collect();
    pre.sort_by(|a, b| newest_first(a, b));
    pre
}

//! Order status state machine
//!
//! The transition table below is the only place that decides whether a
//! status change is legal. The store checks it against the stored status
//! inside its write transaction; views never re-derive it.

use super::types::{Fulfillment, OrderType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Order lifecycle status (kebab-case on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// 预订单，等待店家确认
    PreOrderPending,
    /// 等待店家接单
    Pending,
    Accepted,
    Ready,
    /// 配送中（仅外送）
    InTransit,
    Delivered,
    Completed,
    /// 店家拒单，等待顾客确认
    Denied,
    Cancelled,
}

/// Which side of the conversation is acting
///
/// Owner and staff act on the same side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorSide {
    Customer,
    Restaurant,
}

impl ActorSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorSide::Customer => "customer",
            ActorSide::Restaurant => "restaurant",
        }
    }

    /// The side that reads what this side writes
    pub fn other(&self) -> ActorSide {
        match self {
            ActorSide::Customer => ActorSide::Restaurant,
            ActorSide::Restaurant => ActorSide::Customer,
        }
    }
}

impl fmt::Display for ActorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transition {from} -> {to} is not allowed for {side}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub side: ActorSide,
}

/// One row of the transition table. `fulfillment = None` means any.
struct Transition {
    from: OrderStatus,
    to: OrderStatus,
    side: ActorSide,
    fulfillment: Option<Fulfillment>,
}

const fn row(
    from: OrderStatus,
    to: OrderStatus,
    side: ActorSide,
    fulfillment: Option<Fulfillment>,
) -> Transition {
    Transition {
        from,
        to,
        side,
        fulfillment,
    }
}

use ActorSide::{Customer, Restaurant};
use OrderStatus::*;

const TRANSITIONS: &[Transition] = &[
    // ========== Restaurant ==========
    row(PreOrderPending, Pending, Restaurant, None),
    row(PreOrderPending, Accepted, Restaurant, None),
    row(PreOrderPending, Denied, Restaurant, None),
    row(Pending, Accepted, Restaurant, None),
    row(Pending, Denied, Restaurant, None),
    row(Accepted, Ready, Restaurant, None),
    row(Ready, InTransit, Restaurant, Some(Fulfillment::Delivery)),
    row(Ready, Completed, Restaurant, Some(Fulfillment::Pickup)),
    row(InTransit, Delivered, Restaurant, None),
    // ========== Customer ==========
    row(Pending, Cancelled, Customer, None),
    row(PreOrderPending, Cancelled, Customer, None),
    row(Denied, Cancelled, Customer, None),
];

impl OrderStatus {
    /// Every status, in lifecycle order
    pub const ALL: [OrderStatus; 9] = [
        PreOrderPending,
        Pending,
        Accepted,
        Ready,
        InTransit,
        Delivered,
        Completed,
        Denied,
        Cancelled,
    ];

    /// Status a freshly created order starts in
    pub fn initial(order_type: OrderType) -> Self {
        match order_type {
            OrderType::PreOrder => PreOrderPending,
            OrderType::Immediate => Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Completed | Delivered | Cancelled)
    }

    /// Ongoing fulfillment. Pre-orders only count once accepted.
    pub fn is_active_for(&self, order_type: OrderType) -> bool {
        match order_type {
            OrderType::Immediate => matches!(self, Pending | Accepted | Ready | InTransit),
            OrderType::PreOrder => matches!(self, Accepted | Ready | InTransit),
        }
    }

    pub fn is_cancellable_by_customer(&self) -> bool {
        matches!(self, Pending | PreOrderPending)
    }

    /// A customer with an order in one of these states may not check out again
    pub fn blocks_new_orders(&self) -> bool {
        matches!(self, Pending | PreOrderPending)
    }

    /// Chat closes at the end of the creation day once the order is final
    pub fn is_chat_final(&self) -> bool {
        matches!(self, Completed | Delivered | Cancelled)
    }

    /// Statuses after `ready` hide the prep-time estimate
    pub fn shows_prep_time(&self) -> bool {
        matches!(self, PreOrderPending | Pending | Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreOrderPending => "pre-order-pending",
            Pending => "pending",
            Accepted => "accepted",
            Ready => "ready",
            InTransit => "in-transit",
            Delivered => "delivered",
            Completed => "completed",
            Denied => "denied",
            Cancelled => "cancelled",
        }
    }

    /// Statuses `side` may move this order to, given its fulfillment
    pub fn next_statuses(&self, side: ActorSide, fulfillment: Fulfillment) -> Vec<OrderStatus> {
        TRANSITIONS
            .iter()
            .filter(|t| t.from == *self && t.side == side)
            .filter(|t| t.fulfillment.is_none_or(|f| f == fulfillment))
            .map(|t| t.to)
            .collect()
    }
}

/// Check a status change against the transition table
pub fn transition_allowed(
    from: OrderStatus,
    to: OrderStatus,
    side: ActorSide,
    fulfillment: Fulfillment,
) -> Result<(), TransitionError> {
    let allowed = TRANSITIONS.iter().any(|t| {
        t.from == from
            && t.to == to
            && t.side == side
            && t.fulfillment.is_none_or(|f| f == fulfillment)
    });

    if allowed {
        Ok(())
    } else {
        Err(TransitionError { from, to, side })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDES: [ActorSide; 2] = [Customer, Restaurant];
    const FULFILLMENTS: [Fulfillment; 2] = [Fulfillment::Pickup, Fulfillment::Delivery];

    fn expected_allowed(
        from: OrderStatus,
        to: OrderStatus,
        side: ActorSide,
        fulfillment: Fulfillment,
    ) -> bool {
        match side {
            Restaurant => matches!(
                (from, to),
                (PreOrderPending, Pending)
                    | (PreOrderPending, Accepted)
                    | (PreOrderPending, Denied)
                    | (Pending, Accepted)
                    | (Pending, Denied)
                    | (Accepted, Ready)
                    | (InTransit, Delivered)
            ) || (from == Ready && to == InTransit && fulfillment == Fulfillment::Delivery)
                || (from == Ready && to == Completed && fulfillment == Fulfillment::Pickup),
            Customer => matches!(
                (from, to),
                (Pending, Cancelled) | (PreOrderPending, Cancelled) | (Denied, Cancelled)
            ),
        }
    }

    #[test]
    fn test_transition_table_over_all_pairs() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                for side in SIDES {
                    for fulfillment in FULFILLMENTS {
                        let result = transition_allowed(from, to, side, fulfillment);
                        assert_eq!(
                            result.is_ok(),
                            expected_allowed(from, to, side, fulfillment),
                            "{from} -> {to} by {side} ({fulfillment:?})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_cancelled_to_cancelled_rejected() {
        let err = transition_allowed(Cancelled, Cancelled, Customer, Fulfillment::Pickup)
            .unwrap_err();
        assert_eq!(err.from, Cancelled);
        assert_eq!(err.to, Cancelled);
        assert_eq!(
            err.to_string(),
            "transition cancelled -> cancelled is not allowed for customer"
        );
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for status in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for side in SIDES {
                for fulfillment in FULFILLMENTS {
                    assert!(status.next_statuses(side, fulfillment).is_empty());
                }
            }
        }
    }

    #[test]
    fn test_ready_depends_on_fulfillment() {
        assert_eq!(
            Ready.next_statuses(Restaurant, Fulfillment::Delivery),
            vec![InTransit]
        );
        assert_eq!(
            Ready.next_statuses(Restaurant, Fulfillment::Pickup),
            vec![Completed]
        );
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(OrderStatus::initial(OrderType::Immediate), Pending);
        assert_eq!(OrderStatus::initial(OrderType::PreOrder), PreOrderPending);
    }

    #[test]
    fn test_active_partition() {
        assert!(Pending.is_active_for(OrderType::Immediate));
        assert!(!Pending.is_active_for(OrderType::PreOrder));
        assert!(!PreOrderPending.is_active_for(OrderType::PreOrder));
        assert!(Accepted.is_active_for(OrderType::PreOrder));
        assert!(InTransit.is_active_for(OrderType::Immediate));
        assert!(!Denied.is_active_for(OrderType::Immediate));
        assert!(!Delivered.is_active_for(OrderType::Immediate));
    }

    #[test]
    fn test_predicates() {
        assert!(Pending.is_cancellable_by_customer());
        assert!(!Accepted.is_cancellable_by_customer());
        assert!(PreOrderPending.blocks_new_orders());
        assert!(!Denied.blocks_new_orders());
        assert!(Cancelled.is_chat_final());
        assert!(!Denied.is_chat_final());
        assert!(Accepted.shows_prep_time());
        assert!(!Ready.shows_prep_time());
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_string(&PreOrderPending).unwrap(),
            "\"pre-order-pending\""
        );
        assert_eq!(serde_json::to_string(&InTransit).unwrap(), "\"in-transit\"");
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("all".parse::<OrderStatus>().is_err());
    }
}

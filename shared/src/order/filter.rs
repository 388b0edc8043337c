//! Filter/sort engine for order lists
//!
//! `filter_and_sort_orders` is a pure function: it never touches the input
//! slice and returns the same sequence for the same arguments.
//!
//! The ownership filter is a view convenience. Authorization is enforced by
//! the store, not here.

use super::model::Order;
use super::selector::newest_first;
use super::status::OrderStatus;
use super::types::OrderType;
use crate::util::{day_end_millis, day_start_millis, local_date};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::cmp::Ordering;
use std::collections::HashMap;

pub type OrderPredicate<'a> = Box<dyn Fn(&Order) -> bool + 'a>;
pub type OrderComparator<'a> = Box<dyn Fn(&Order, &Order) -> Ordering + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Exact(OrderStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Exact)
        }
    }
}

/// Filter arguments
#[derive(Default)]
pub struct OrderFilter<'a> {
    /// Only this customer's orders. `None` is for restaurant views.
    pub customer_id: Option<String>,
    /// Inclusive, floored to local 00:00:00.000
    pub from_date: Option<NaiveDate>,
    /// Inclusive, ceiled to local 23:59:59.999
    pub to_date: Option<NaiveDate>,
    pub status: StatusFilter,
    pub order_type: Option<OrderType>,
    pub custom_filter: Option<OrderPredicate<'a>>,
    /// Replaces `status` matching when set
    pub custom_status_matcher: Option<OrderPredicate<'a>>,
    /// Replaces newest-first ordering when set
    pub custom_sort: Option<OrderComparator<'a>>,
}

impl<'a> OrderFilter<'a> {
    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Default::default()
        }
    }

    pub fn with_status_matcher(mut self, matcher: impl Fn(&Order) -> bool + 'a) -> Self {
        self.custom_status_matcher = Some(Box::new(matcher));
        self
    }

    pub fn with_sort(mut self, sort: impl Fn(&Order, &Order) -> Ordering + 'a) -> Self {
        self.custom_sort = Some(Box::new(sort));
        self
    }
}

pub fn filter_and_sort_orders<'o>(
    orders: &'o [Order],
    filter: &OrderFilter<'_>,
    tz: Tz,
) -> Vec<&'o Order> {
    let from = filter.from_date.map(|d| day_start_millis(d, tz));
    let to = filter.to_date.map(|d| day_end_millis(d, tz));

    let mut result: Vec<&Order> = orders
        .iter()
        .filter(|&o| {
            filter
                .customer_id
                .as_deref()
                .is_none_or(|id| o.is_owned_by(id))
        })
        .filter(|&o| from.is_none_or(|start| o.created_at >= start))
        .filter(|&o| to.is_none_or(|end| o.created_at <= end))
        .filter(|&o| match &filter.custom_status_matcher {
            Some(matcher) => matcher(o),
            None => match filter.status {
                StatusFilter::All => true,
                StatusFilter::Exact(status) => o.status == status,
            },
        })
        .filter(|&o| filter.order_type.is_none_or(|t| o.order_type == t))
        .filter(|&o| filter.custom_filter.as_ref().is_none_or(|f| f(o)))
        .collect();

    match &filter.custom_sort {
        Some(sort) => result.sort_by(|a, b| sort(a, b).then_with(|| b.order_id.cmp(&a.order_id))),
        None => result.sort_by(|a, b| newest_first(a, b)),
    }

    result
}

// ========== Helper matchers ==========

/// "active" bucket: order is in ongoing fulfillment for its type
pub fn active_matcher() -> impl Fn(&Order) -> bool {
    |o: &Order| o.is_active()
}

/// "recent" bucket: last chat message was sent on `today`
pub fn recent_chat_matcher<'a>(
    last_message_times: &'a HashMap<String, i64>,
    today: NaiveDate,
    tz: Tz,
) -> impl Fn(&Order) -> bool + 'a {
    move |o: &Order| {
        last_message_times
            .get(&o.order_id)
            .is_some_and(|ts| local_date(*ts, tz) == today)
    }
}

/// Last chat message first; orders without messages follow, newest first
pub fn by_last_message_desc<'a>(
    last_message_times: &'a HashMap<String, i64>,
) -> impl Fn(&Order, &Order) -> Ordering + 'a {
    move |a: &Order, b: &Order| {
        let ta = last_message_times.get(&a.order_id);
        let tb = last_message_times.get(&b.order_id);
        match (ta, tb) {
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.created_at.cmp(&a.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::model::fixtures::{order, pre_order};
    use chrono::TimeZone;
    use chrono_tz::Asia::Manila;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Manila
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(orders: &[&Order]) -> Vec<String> {
        orders.iter().map(|o| o.order_id.clone()).collect()
    }

    fn sample() -> Vec<Order> {
        vec![
            order("a", "c1", at(2026, 10, 16, 9, 0), OrderStatus::Completed),
            order("b", "c1", at(2026, 10, 17, 0, 0), OrderStatus::Accepted),
            order("c", "c1", at(2026, 10, 17, 23, 59), OrderStatus::Pending),
            order("d", "c2", at(2026, 10, 17, 12, 0), OrderStatus::Pending),
            pre_order("e", "c1", at(2026, 10, 18, 8, 0), OrderStatus::PreOrderPending),
        ]
    }

    #[test]
    fn test_ownership_applied_first() {
        let orders = sample();
        let result = filter_and_sort_orders(&orders, &OrderFilter::for_customer("c2"), Manila);
        assert_eq!(ids(&result), vec!["d"]);
    }

    #[test]
    fn test_default_sort_newest_first() {
        let orders = sample();
        let result = filter_and_sort_orders(&orders, &OrderFilter::for_customer("c1"), Manila);
        assert_eq!(ids(&result), vec!["e", "c", "b", "a"]);
    }

    #[test]
    fn test_date_range_inclusive_local_days() {
        let orders = sample();
        let filter = OrderFilter {
            from_date: Some(date(2026, 10, 17)),
            to_date: Some(date(2026, 10, 17)),
            ..OrderFilter::for_customer("c1")
        };
        let result = filter_and_sort_orders(&orders, &filter, Manila);
        assert_eq!(ids(&result), vec!["c", "b"]);
    }

    #[test]
    fn test_status_and_type_filters() {
        let orders = sample();
        let filter = OrderFilter {
            status: StatusFilter::Exact(OrderStatus::Pending),
            ..OrderFilter::for_customer("c1")
        };
        assert_eq!(ids(&filter_and_sort_orders(&orders, &filter, Manila)), vec!["c"]);

        let filter = OrderFilter {
            order_type: Some(OrderType::PreOrder),
            ..OrderFilter::for_customer("c1")
        };
        assert_eq!(ids(&filter_and_sort_orders(&orders, &filter, Manila)), vec!["e"]);
    }

    #[test]
    fn test_custom_status_matcher_overrides_status() {
        let orders = sample();
        let filter = OrderFilter {
            status: StatusFilter::Exact(OrderStatus::Completed),
            ..OrderFilter::for_customer("c1")
        }
        .with_status_matcher(active_matcher());
        assert_eq!(
            ids(&filter_and_sort_orders(&orders, &filter, Manila)),
            vec!["c", "b"]
        );
    }

    #[test]
    fn test_recent_bucket_sorted_by_last_message() {
        let orders = sample();
        let mut last = HashMap::new();
        last.insert("a".to_string(), at(2026, 10, 18, 9, 0));
        last.insert("b".to_string(), at(2026, 10, 18, 10, 0));
        last.insert("c".to_string(), at(2026, 10, 17, 10, 0));

        let filter = OrderFilter::for_customer("c1")
            .with_status_matcher(recent_chat_matcher(&last, date(2026, 10, 18), Manila))
            .with_sort(by_last_message_desc(&last));
        assert_eq!(
            ids(&filter_and_sort_orders(&orders, &filter, Manila)),
            vec!["b", "a"]
        );
    }

    #[test]
    fn test_custom_filter() {
        let orders = sample();
        let filter = OrderFilter {
            custom_filter: Some(Box::new(|o: &Order| o.order_id != "b")),
            ..OrderFilter::for_customer("c1")
        };
        assert_eq!(
            ids(&filter_and_sort_orders(&orders, &filter, Manila)),
            vec!["e", "c", "a"]
        );
    }

    #[test]
    fn test_deterministic_and_pure() {
        let orders = sample();
        let before = orders.clone();
        let filter = OrderFilter::for_customer("c1");
        let first = ids(&filter_and_sort_orders(&orders, &filter, Manila));
        let second = ids(&filter_and_sort_orders(&orders, &filter, Manila));
        assert_eq!(first, second);
        assert_eq!(orders, before);
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(
            "in-transit".parse::<StatusFilter>(),
            Ok(StatusFilter::Exact(OrderStatus::InTransit))
        );
        assert!("bogus".parse::<StatusFilter>().is_err());
    }
}

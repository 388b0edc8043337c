use super::*;
use shared::models::{Role, Voucher, VoucherType};
use shared::order::{DraftItem, PaymentError, RemainingPaymentMethod};
use std::collections::BTreeMap;

mod test_core;

const HOUR_MS: i64 = 3_600_000;

fn voucher(code: &str, value: f64, min_order_amount: f64) -> Voucher {
    Voucher {
        code: code.to_string(),
        voucher_type: VoucherType::Fixed,
        value,
        min_order_amount,
        max_discount: None,
        expires_at: None,
        usage_limit: None,
        usage_count: 0,
        active: true,
    }
}

fn create_test_manager() -> OrdersManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    OrdersManager::with_storage(storage)
}

fn customer(id: &str) -> CurrentUser {
    CurrentUser::new(id, format!("Customer {id}"), Role::Customer)
}

fn owner() -> CurrentUser {
    CurrentUser::new("owner-1", "Owner", Role::Owner)
}

fn staff() -> CurrentUser {
    CurrentUser::new("staff-1", "Staff", Role::Staff)
}

fn item(menu_item_id: &str, quantity: u32) -> DraftItem {
    DraftItem {
        menu_item_id: menu_item_id.to_string(),
        quantity,
        variant: None,
        selected_choices: BTreeMap::new(),
        unit_price: None,
    }
}

/// Pickup, full payment: adobo 100 + sinigang 150
fn pickup_draft() -> OrderDraft {
    OrderDraft {
        order_type: OrderType::Immediate,
        fulfillment: Fulfillment::Pickup,
        scheduled_at: None,
        customer_name: "Juan Dela Cruz".to_string(),
        customer_phone: "09171234567".to_string(),
        delivery_address: None,
        coordinates: None,
        items: vec![item("adobo", 1), item("sinigang", 1)],
        voucher_code: None,
        payment_plan: PaymentPlan::Full,
        downpayment_amount: None,
        remaining_payment_method: None,
        payment_proof_url: "proofs/initial.png".to_string(),
        note: None,
        client_total: None,
    }
}

fn delivery_draft(address: &str) -> OrderDraft {
    OrderDraft {
        fulfillment: Fulfillment::Delivery,
        delivery_address: Some(address.to_string()),
        ..pickup_draft()
    }
}

fn pre_order_draft(hours_ahead: i64) -> OrderDraft {
    OrderDraft {
        order_type: OrderType::PreOrder,
        scheduled_at: Some(shared::util::now_millis() + hours_ahead * HOUR_MS),
        ..pickup_draft()
    }
}

fn downpayment_draft(method: RemainingPaymentMethod) -> OrderDraft {
    OrderDraft {
        payment_plan: PaymentPlan::Downpayment,
        remaining_payment_method: Some(method),
        ..pickup_draft()
    }
}

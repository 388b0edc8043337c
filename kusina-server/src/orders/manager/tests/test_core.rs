use super::*;
use crate::services::VoucherRegistry;

#[test]
fn test_create_order_computes_totals() {
    let manager = create_test_manager();
    let order = manager
        .create_order(&customer("c1"), pickup_draft())
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.customer_id, "c1");
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.subtotal, 250.0);
    assert_eq!(order.platform_fee, 10.0);
    assert_eq!(order.delivery_fee, 0.0);
    assert_eq!(order.discount, 0.0);
    assert_eq!(order.total, 260.0);
    assert!(order.allow_chat);
    assert!(!order.allow_customer_images);
    assert!(order.order_number.starts_with("KSN"));
    assert!(order.order_number.ends_with("10001"));

    let stored = manager.get_order(&customer("c1"), &order.order_id).unwrap();
    assert_eq!(stored, order);
}

#[test]
fn test_receipt_numbers_are_sequential() {
    let manager = create_test_manager();
    let first = manager.create_order(&customer("c1"), pickup_draft()).unwrap();
    let second = manager.create_order(&customer("c2"), pickup_draft()).unwrap();
    assert!(first.order_number.ends_with("10001"));
    assert!(second.order_number.ends_with("10002"));
}

#[test]
fn test_second_pending_order_rejected() {
    let manager = create_test_manager();
    let first = manager.create_order(&customer("c1"), pickup_draft()).unwrap();

    let err = manager
        .create_order(&customer("c1"), pickup_draft())
        .unwrap_err();
    match err {
        ManagerError::ActiveOrderExists(order_id) => assert_eq!(order_id, first.order_id),
        other => panic!("expected ActiveOrderExists, got {other:?}"),
    }

    // Rejected checkout does not consume a receipt number
    assert_eq!(manager.storage().get_order_count().unwrap(), 1);
}

#[test]
fn test_catalog_price_wins_over_client_price() {
    let manager = create_test_manager();
    let mut draft = pickup_draft();
    draft.items = vec![DraftItem {
        unit_price: Some(1.0),
        ..item("adobo", 2)
    }];
    draft.client_total = Some(3.0);

    let order = manager.create_order(&customer("c1"), draft).unwrap();
    assert_eq!(order.items[0].unit_price, 100.0);
    assert_eq!(order.items[0].line_total, 200.0);
    assert_eq!(order.total, 210.0);
}

#[test]
fn test_variant_and_choice_pricing() {
    let manager = create_test_manager();
    let mut draft = pickup_draft();
    let mut choices = BTreeMap::new();
    choices.insert("Rice".to_string(), "Garlic".to_string());
    draft.items = vec![
        DraftItem {
            selected_choices: choices,
            ..item("adobo", 1)
        },
        DraftItem {
            variant: Some("Family".to_string()),
            ..item("sinigang", 1)
        },
    ];

    let order = manager.create_order(&customer("c1"), draft).unwrap();
    assert_eq!(order.items[0].unit_price, 115.0);
    assert_eq!(order.items[1].unit_price, 320.0);
    assert_eq!(order.subtotal, 435.0);
}

#[test]
fn test_unknown_or_unavailable_item_rejected() {
    let manager = create_test_manager();

    let mut draft = pickup_draft();
    draft.items = vec![item("lechon", 1)];
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::Catalog(_))
    ));

    let mut draft = pickup_draft();
    draft.items = vec![item("halo-halo", 1)];
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::Catalog(_))
    ));
}

#[test]
fn test_draft_validation() {
    let manager = create_test_manager();

    let mut draft = pickup_draft();
    draft.items.clear();
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::InvalidDraft(_))
    ));

    let mut draft = pickup_draft();
    draft.items = vec![item("adobo", 0)];
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::InvalidDraft(_))
    ));

    let mut draft = pickup_draft();
    draft.customer_name = "   ".to_string();
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::Validation(_))
    ));

    let mut draft = pickup_draft();
    draft.payment_proof_url = "  ".to_string();
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::PaymentProofRequired)
    ));
}

#[test]
fn test_delivery_requires_address_and_charges_zone_fee() {
    let manager = create_test_manager();

    let mut draft = delivery_draft("  ");
    draft.items = vec![item("adobo", 1)];
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::AddressRequired)
    ));

    let order = manager
        .create_order(&customer("c1"), delivery_draft("12 Ayala Ave, Makati"))
        .unwrap();
    assert_eq!(order.delivery_fee, 50.0);
    assert_eq!(order.total, 310.0);

    let order = manager
        .create_order(&customer("c2"), delivery_draft("Cebu City"))
        .unwrap();
    assert_eq!(order.delivery_fee, 0.0);
}

#[test]
fn test_pickup_drops_address() {
    let manager = create_test_manager();
    let mut draft = pickup_draft();
    draft.delivery_address = Some("12 Ayala Ave, Makati".to_string());

    let order = manager.create_order(&customer("c1"), draft).unwrap();
    assert!(order.delivery_address.is_none());
    assert_eq!(order.delivery_fee, 0.0);
}

#[test]
fn test_schedule_rules() {
    let manager = create_test_manager();

    let mut draft = pre_order_draft(1);
    draft.scheduled_at = None;
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::InvalidSchedule(_))
    ));

    assert!(matches!(
        manager.create_order(&customer("c1"), pre_order_draft(-1)),
        Err(ManagerError::InvalidSchedule(_))
    ));

    let mut draft = pickup_draft();
    draft.scheduled_at = Some(shared::util::now_millis() + HOUR_MS);
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::InvalidSchedule(_))
    ));
}

#[test]
fn test_only_customers_create_orders() {
    let manager = create_test_manager();
    for actor in [owner(), staff()] {
        assert!(matches!(
            manager.create_order(&actor, pickup_draft()),
            Err(ManagerError::PermissionDenied(_))
        ));
    }
}

#[test]
fn test_voucher_discount_applied_and_redeemed() {
    let mut manager = create_test_manager();
    let registry = Arc::new(VoucherRegistry::with_vouchers([
        voucher("KAIN20", 20.0, 0.0),
        voucher("BIG500", 50.0, 500.0),
    ]));
    manager.set_vouchers(registry.clone());

    let mut draft = pickup_draft();
    draft.voucher_code = Some(" kain20 ".to_string());
    let order = manager.create_order(&customer("c1"), draft).unwrap();
    assert_eq!(order.discount, 20.0);
    assert_eq!(order.total, 240.0);
    assert_eq!(order.voucher_code.as_deref(), Some("kain20"));

    let mut draft = pickup_draft();
    draft.voucher_code = Some("BIG500".to_string());
    assert!(matches!(
        manager.create_order(&customer("c2"), draft),
        Err(ManagerError::VoucherRejected(_))
    ));

    let mut draft = pickup_draft();
    draft.voucher_code = Some("NOPE99".to_string());
    assert!(matches!(
        manager.create_order(&customer("c2"), draft),
        Err(ManagerError::Voucher(_))
    ));
}

#[test]
fn test_downpayment_defaults_to_half() {
    let manager = create_test_manager();
    let order = manager
        .create_order(
            &customer("c1"),
            downpayment_draft(RemainingPaymentMethod::Online),
        )
        .unwrap();
    assert_eq!(order.downpayment_amount, Some(130.0));

    let mut draft = downpayment_draft(RemainingPaymentMethod::Cash);
    draft.downpayment_amount = Some(260.0);
    assert!(matches!(
        manager.create_order(&customer("c2"), draft),
        Err(ManagerError::Payment(_))
    ));

    let mut draft = pickup_draft();
    draft.downpayment_amount = Some(100.0);
    assert!(matches!(
        manager.create_order(&customer("c2"), draft),
        Err(ManagerError::Payment(PaymentError::UnexpectedDownpaymentFields))
    ));
}

#[test]
fn test_downpayment_is_rounded_to_cents() {
    let manager = create_test_manager();

    let mut draft = downpayment_draft(RemainingPaymentMethod::Cash);
    draft.downpayment_amount = Some(0.001);
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::Payment(PaymentError::DownpaymentOutOfRange { .. }))
    ));

    let mut draft = downpayment_draft(RemainingPaymentMethod::Cash);
    draft.downpayment_amount = Some(259.999);
    assert!(matches!(
        manager.create_order(&customer("c1"), draft),
        Err(ManagerError::Payment(PaymentError::DownpaymentOutOfRange { .. }))
    ));

    let mut draft = downpayment_draft(RemainingPaymentMethod::Cash);
    draft.downpayment_amount = Some(45.678);
    let order = manager.create_order(&customer("c1"), draft).unwrap();
    assert_eq!(order.downpayment_amount, Some(45.68));

    let status = payment::resolve(&order);
    assert_eq!(status.amount_due_now, 45.68);
    assert_eq!(status.remaining_balance, 214.32);
}

#[test]
fn test_create_broadcasts_order_updated() {
    let manager = create_test_manager();
    let mut rx = manager.bus().subscribe();

    let order = manager.create_order(&customer("c1"), pickup_draft()).unwrap();

    let msg = rx.try_recv().unwrap();
    assert_eq!(msg.order_id, order.order_id);
    assert_eq!(msg.customer_id, "c1");
    assert_eq!(msg.event_type(), shared::message::EventType::OrderUpdated);
}

//! Fixtures shared by the unit tests in this crate.

use chrono::{DateTime, Duration, TimeZone, Utc};

use folio_core::{Aggregate, OrderId, ProductId, UserId};

use crate::command::{
    DeliverOrder, MarkProcessing, OrderCommand, PlaceOrder, ProcessRefund, RequestRefund,
    ResolveRefund, ShipOrder, VerifyPayment,
};
use crate::order::Order;
use crate::refund::RefundDecision;
use crate::status::OrderStatus;
use crate::value_objects::{
    Actor, Address, ItemType, NewOrderItem, PaymentKind, PaymentMethod, Pricing, ShippingUpdate,
};

/// Placement time of every fixture order.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// `t0` plus `minutes`.
pub(crate) fn later(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub(crate) fn admin() -> Actor {
    Actor::Admin(UserId::from_uuid(uuid::Uuid::from_u128(0xad)))
}

pub(crate) fn address() -> Address {
    Address {
        full_name: "Mina Rahimi".to_string(),
        address: "12 Cedar Row".to_string(),
        city: "Herat".to_string(),
        state: "Herat".to_string(),
        postal_code: "3001".to_string(),
        country: "AF".to_string(),
        phone: Some("+93 700 000 000".to_string()),
    }
}

/// Two books at 30.00 and a poster at 40.00; total 120.00 with tax and
/// shipping.
pub(crate) fn place_cmd() -> PlaceOrder {
    PlaceOrder {
        order_id: OrderId::new(),
        order_number: "ORD-20240501-0001".to_string(),
        user_id: UserId::new(),
        items: vec![
            NewOrderItem {
                product_id: ProductId::new(),
                item_type: ItemType::Book,
                title: "The Salt Road".to_string(),
                price: 3_000,
                quantity: 2,
            },
            NewOrderItem {
                product_id: ProductId::new(),
                item_type: ItemType::Poster,
                title: "Harbour at Dusk".to_string(),
                price: 4_000,
                quantity: 1,
            },
        ],
        shipping_address: address(),
        billing_address: Address {
            phone: None,
            ..address()
        },
        payment_method: PaymentMethod {
            kind: PaymentKind::Epay,
            name: "ePay transfer".to_string(),
            account_number: "0011223344".to_string(),
            account_name: "Folio Books".to_string(),
            bank_name: "Kabul Bank".to_string(),
        },
        transaction_proof: "proofs/2024/05/receipt-0001.jpg".to_string(),
        pricing: Pricing {
            subtotal: 10_000,
            tax: 800,
            shipping: 1_200,
            total: 12_000,
        },
        notes: Some("  Please gift wrap ".to_string()),
        verification_deadline: Some(t0() + Duration::hours(48)),
        occurred_at: t0(),
    }
}

/// Handle `cmd` and apply every decided event.
pub(crate) fn apply_all(order: &mut Order, cmd: OrderCommand) {
    let events = order.handle(&cmd).unwrap();
    for event in &events {
        order.apply(event);
    }
}

pub(crate) fn placed_order() -> Order {
    let cmd = place_cmd();
    let mut order = Order::empty(cmd.order_id);
    apply_all(&mut order, OrderCommand::PlaceOrder(cmd));
    order
}

/// A placed order driven through the workflows until it reaches `status`.
/// Steps are stamped at `later(1)` to `later(7)`.
pub(crate) fn order_in(status: OrderStatus) -> Order {
    let mut order = placed_order();
    let id = order.id_typed();

    if status == OrderStatus::PendingVerification {
        return order;
    }

    let approved = status != OrderStatus::Cancelled;
    apply_all(
        &mut order,
        OrderCommand::VerifyPayment(VerifyPayment {
            order_id: id,
            approved,
            notes: if approved { "Transfer confirmed" } else { "Transfer not found" }.to_string(),
            actor: admin(),
            occurred_at: later(1),
        }),
    );

    let steps: [(OrderStatus, OrderCommand); 4] = [
        (
            OrderStatus::Verified,
            OrderCommand::MarkProcessing(MarkProcessing {
                order_id: id,
                actor: admin(),
                occurred_at: later(2),
            }),
        ),
        (
            OrderStatus::Processing,
            OrderCommand::ShipOrder(ShipOrder {
                order_id: id,
                shipping: ShippingUpdate::tracked("DHL", "TRK1"),
                actor: admin(),
                occurred_at: later(3),
            }),
        ),
        (
            OrderStatus::Shipped,
            OrderCommand::DeliverOrder(DeliverOrder {
                order_id: id,
                actor: admin(),
                occurred_at: later(4),
            }),
        ),
        (
            OrderStatus::Delivered,
            OrderCommand::RequestRefund(RequestRefund {
                order_id: id,
                reason: "Wrong edition".to_string(),
                requested_by: Actor::Customer(order.user_id()),
                occurred_at: later(5),
            }),
        ),
    ];

    for (reached, next) in steps {
        if order.status() == status {
            return order;
        }
        debug_assert_eq!(order.status(), reached);
        apply_all(&mut order, next);
    }

    if order.status() == status {
        return order;
    }

    apply_all(
        &mut order,
        OrderCommand::ResolveRefund(ResolveRefund {
            order_id: id,
            decision: RefundDecision::Approved,
            actor: admin(),
            occurred_at: later(6),
        }),
    );
    let total = order.pricing().total;
    apply_all(
        &mut order,
        OrderCommand::ProcessRefund(ProcessRefund {
            order_id: id,
            amount: total,
            actor: admin(),
            occurred_at: later(7),
        }),
    );
    assert_eq!(order.status(), status);
    order
}

//! Fixtures shared by the infra tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use folio_core::{Aggregate, OrderId, ProductId, UserId};
use folio_orders::{
    Actor, Address, ItemType, NewOrderItem, Order, OrderCommand, PaymentKind, PaymentMethod,
    PlaceOrder, Pricing, VerifyPayment,
};

use crate::order_service::NewOrder;

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

pub(crate) fn admin() -> Actor {
    Actor::Admin(UserId::from_uuid(uuid::Uuid::from_u128(0xad)))
}

fn address() -> Address {
    Address {
        full_name: "Farid Noori".to_string(),
        address: "4 Shahr-e Naw".to_string(),
        city: "Kabul".to_string(),
        state: "Kabul".to_string(),
        postal_code: "1001".to_string(),
        country: "AF".to_string(),
        phone: Some("+93 799 000 111".to_string()),
    }
}

/// One book at 100 with tax 8 and shipping 12: total 120.
pub(crate) fn new_order(user_id: UserId) -> NewOrder {
    NewOrder {
        user_id,
        items: vec![NewOrderItem {
            product_id: ProductId::new(),
            item_type: ItemType::Book,
            title: "Rivers of the North".to_string(),
            price: 100,
            quantity: 1,
        }],
        shipping_address: address(),
        billing_address: address(),
        payment_method: PaymentMethod {
            kind: PaymentKind::Fbx,
            name: "FBX transfer".to_string(),
            account_number: "998877".to_string(),
            account_name: "Folio Books".to_string(),
            bank_name: "First MicroFinance Bank".to_string(),
        },
        transaction_proof: "proofs/receipt.png".to_string(),
        pricing: Pricing {
            subtotal: 100,
            tax: 8,
            shipping: 12,
            total: 120,
        },
        notes: None,
    }
}

/// A freshly placed order (version 1) with a 48h deadline.
pub(crate) fn placed(order_number: &str, user_id: UserId, at: DateTime<Utc>) -> Order {
    let input = new_order(user_id);
    let order_id = OrderId::new();
    let command = OrderCommand::PlaceOrder(PlaceOrder {
        order_id,
        order_number: order_number.to_string(),
        user_id,
        items: input.items,
        shipping_address: input.shipping_address,
        billing_address: input.billing_address,
        payment_method: input.payment_method,
        transaction_proof: input.transaction_proof,
        pricing: input.pricing,
        notes: input.notes,
        verification_deadline: Some(at + Duration::hours(48)),
        occurred_at: at,
    });

    let mut order = Order::empty(order_id);
    for event in order.handle(&command).unwrap() {
        order.apply(&event);
    }
    order
}

/// `order` with its payment approved at `at`.
pub(crate) fn verified(order: &Order, at: DateTime<Utc>) -> Order {
    let mut next = order.clone();
    let command = OrderCommand::VerifyPayment(VerifyPayment {
        order_id: order.id_typed(),
        approved: true,
        notes: "ok".to_string(),
        actor: admin(),
        occurred_at: at,
    });
    for event in next.handle(&command).unwrap() {
        next.apply(&event);
    }
    next
}

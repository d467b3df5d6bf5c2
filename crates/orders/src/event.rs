//! Events emitted by the order aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::{OrderId, UserId};
use folio_events::Event;

use crate::refund::RefundDecision;
use crate::status::OrderStatus;
use crate::value_objects::{
    Actor, Address, NoteField, OrderItem, PaymentMethod, Pricing, Priority, ShippingUpdate,
};

/// Event: OrderPlaced. Items carry derived subtotals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    pub transaction_proof: String,
    pub pricing: Pricing,
    pub notes: Option<String>,
    pub verification_deadline: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerified {
    pub order_id: OrderId,
    pub notes: Option<String>,
    pub verified_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRejected {
    pub order_id: OrderId,
    pub notes: Option<String>,
    pub rejected_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged. Only the transition engine emits it; applying it is
/// the only write to `status` and always adds a timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub note: String,
    pub changed_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecorded {
    pub order_id: OrderId,
    pub shipping: ShippingUpdate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfirmed {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequested {
    pub order_id: OrderId,
    pub reason: String,
    pub requested_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResolved {
    pub order_id: OrderId,
    pub decision: RefundDecision,
    pub resolved_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundProcessed {
    pub order_id: OrderId,
    pub amount: u64,
    pub processed_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesUpdated {
    pub order_id: OrderId,
    pub field: NoteField,
    pub text: Option<String>,
    pub updated_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityChanged {
    pub order_id: OrderId,
    pub priority: Priority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsUpdated {
    pub order_id: OrderId,
    pub tags: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderArchived {
    pub order_id: OrderId,
    pub archived_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    PaymentVerified(PaymentVerified),
    PaymentRejected(PaymentRejected),
    StatusChanged(StatusChanged),
    ShipmentRecorded(ShipmentRecorded),
    DeliveryConfirmed(DeliveryConfirmed),
    RefundRequested(RefundRequested),
    RefundResolved(RefundResolved),
    RefundProcessed(RefundProcessed),
    NotesUpdated(NotesUpdated),
    PriorityChanged(PriorityChanged),
    TagsUpdated(TagsUpdated),
    OrderArchived(OrderArchived),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::PaymentVerified(e) => e.order_id,
            OrderEvent::PaymentRejected(e) => e.order_id,
            OrderEvent::StatusChanged(e) => e.order_id,
            OrderEvent::ShipmentRecorded(e) => e.order_id,
            OrderEvent::DeliveryConfirmed(e) => e.order_id,
            OrderEvent::RefundRequested(e) => e.order_id,
            OrderEvent::RefundResolved(e) => e.order_id,
            OrderEvent::RefundProcessed(e) => e.order_id,
            OrderEvent::NotesUpdated(e) => e.order_id,
            OrderEvent::PriorityChanged(e) => e.order_id,
            OrderEvent::TagsUpdated(e) => e.order_id,
            OrderEvent::OrderArchived(e) => e.order_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::PaymentVerified(_) => "orders.order.payment_verified",
            OrderEvent::PaymentRejected(_) => "orders.order.payment_rejected",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
            OrderEvent::ShipmentRecorded(_) => "orders.order.shipment_recorded",
            OrderEvent::DeliveryConfirmed(_) => "orders.order.delivery_confirmed",
            OrderEvent::RefundRequested(_) => "orders.order.refund_requested",
            OrderEvent::RefundResolved(_) => "orders.order.refund_resolved",
            OrderEvent::RefundProcessed(_) => "orders.order.refund_processed",
            OrderEvent::NotesUpdated(_) => "orders.order.notes_updated",
            OrderEvent::PriorityChanged(_) => "orders.order.priority_changed",
            OrderEvent::TagsUpdated(_) => "orders.order.tags_updated",
            OrderEvent::OrderArchived(_) => "orders.order.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::PaymentVerified(e) => e.occurred_at,
            OrderEvent::PaymentRejected(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
            OrderEvent::ShipmentRecorded(e) => e.occurred_at,
            OrderEvent::DeliveryConfirmed(e) => e.occurred_at,
            OrderEvent::RefundRequested(e) => e.occurred_at,
            OrderEvent::RefundResolved(e) => e.occurred_at,
            OrderEvent::RefundProcessed(e) => e.occurred_at,
            OrderEvent::NotesUpdated(e) => e.occurred_at,
            OrderEvent::PriorityChanged(e) => e.occurred_at,
            OrderEvent::TagsUpdated(e) => e.occurred_at,
            OrderEvent::OrderArchived(e) => e.occurred_at,
        }
    }
}

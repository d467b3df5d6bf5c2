//! Commands accepted by the order aggregate.
//!
//! Every command names the order it targets and carries a server-assigned
//! `occurred_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::{OrderId, UserId};

use crate::refund::RefundDecision;
use crate::status::OrderStatus;
use crate::value_objects::{
    Actor, Address, NewOrderItem, NoteField, PaymentMethod, Pricing, Priority, ShippingUpdate,
};

/// Command: PlaceOrder (issued by checkout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    /// Reference (URL or storage path) to the uploaded transfer proof.
    pub transaction_proof: String,
    pub pricing: Pricing,
    pub notes: Option<String>,
    pub verification_deadline: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: VerifyPayment (approve or reject the transfer proof).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPayment {
    pub order_id: OrderId,
    pub approved: bool,
    pub notes: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateStatus (generic admin status change, routed to the
/// matching workflow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub order_id: OrderId,
    pub target: OrderStatus,
    pub shipping: Option<ShippingUpdate>,
    pub note: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkProcessing {
    pub order_id: OrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOrder {
    pub order_id: OrderId,
    pub shipping: ShippingUpdate,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverOrder {
    pub order_id: OrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRefund {
    pub order_id: OrderId,
    pub reason: String,
    pub requested_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRefund {
    pub order_id: OrderId,
    pub decision: RefundDecision,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRefund {
    pub order_id: OrderId,
    /// Amount returned to the customer, in minor currency units.
    pub amount: u64,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateNotes. `None` or blank text clears the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNotes {
    pub order_id: OrderId,
    pub field: NoteField,
    pub text: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPriority {
    pub order_id: OrderId,
    pub priority: Priority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTags {
    pub order_id: OrderId,
    pub tags: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOrder {
    pub order_id: OrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    VerifyPayment(VerifyPayment),
    UpdateStatus(UpdateStatus),
    MarkProcessing(MarkProcessing),
    ShipOrder(ShipOrder),
    DeliverOrder(DeliverOrder),
    RequestRefund(RequestRefund),
    ResolveRefund(ResolveRefund),
    ProcessRefund(ProcessRefund),
    UpdateNotes(UpdateNotes),
    SetPriority(SetPriority),
    SetTags(SetTags),
    ArchiveOrder(ArchiveOrder),
}

impl OrderCommand {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderCommand::PlaceOrder(c) => c.order_id,
            OrderCommand::VerifyPayment(c) => c.order_id,
            OrderCommand::UpdateStatus(c) => c.order_id,
            OrderCommand::MarkProcessing(c) => c.order_id,
            OrderCommand::ShipOrder(c) => c.order_id,
            OrderCommand::DeliverOrder(c) => c.order_id,
            OrderCommand::RequestRefund(c) => c.order_id,
            OrderCommand::ResolveRefund(c) => c.order_id,
            OrderCommand::ProcessRefund(c) => c.order_id,
            OrderCommand::UpdateNotes(c) => c.order_id,
            OrderCommand::SetPriority(c) => c.order_id,
            OrderCommand::SetTags(c) => c.order_id,
            OrderCommand::ArchiveOrder(c) => c.order_id,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::PlaceOrder(_) => "place_order",
            OrderCommand::VerifyPayment(_) => "verify_payment",
            OrderCommand::UpdateStatus(_) => "update_status",
            OrderCommand::MarkProcessing(_) => "mark_processing",
            OrderCommand::ShipOrder(_) => "ship_order",
            OrderCommand::DeliverOrder(_) => "deliver_order",
            OrderCommand::RequestRefund(_) => "request_refund",
            OrderCommand::ResolveRefund(_) => "resolve_refund",
            OrderCommand::ProcessRefund(_) => "process_refund",
            OrderCommand::UpdateNotes(_) => "update_notes",
            OrderCommand::SetPriority(_) => "set_priority",
            OrderCommand::SetTags(_) => "set_tags",
            OrderCommand::ArchiveOrder(_) => "archive_order",
        }
    }
}

//! The Order aggregate root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use folio_core::{Aggregate, AggregateRoot, OrderId, UserId};
use folio_events::Event;

use crate::command::{ArchiveOrder, OrderCommand, PlaceOrder, SetPriority, SetTags, UpdateNotes};
use crate::error::{OrderError, OrderResult};
use crate::event::{
    NotesUpdated, OrderArchived, OrderEvent, OrderPlaced, PriorityChanged, TagsUpdated,
};
use crate::expiry;
use crate::refund::{Refund, RefundDecision};
use crate::status::{OrderStatus, PaymentStatus};
use crate::timeline::{Timeline, TimelineStatus};
use crate::value_objects::{
    Actor, Address, NoteField, OrderItem, PaymentMethod, Pricing, Priority, ShippingInfo,
};

/// Aggregate type name used on event envelopes and in logs.
pub const AGGREGATE_TYPE: &str = "orders.order";

pub(crate) const PLACED_NOTE: &str = "Order placed, awaiting payment verification";

/// Aggregate root: Order.
///
/// State only changes through [`Aggregate::apply`]. Fields are crate-private
/// so `status` and `payment_status` cannot be written around the workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub(crate) id: OrderId,
    pub(crate) order_number: String,
    pub(crate) user_id: UserId,
    pub(crate) items: Vec<OrderItem>,
    pub(crate) shipping_address: Address,
    pub(crate) billing_address: Address,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) transaction_proof: String,
    pub(crate) pricing: Pricing,
    pub(crate) status: OrderStatus,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) verification_deadline: Option<DateTime<Utc>>,
    pub(crate) verification_notes: Option<String>,
    pub(crate) admin_notes: Option<String>,
    pub(crate) notes: Option<String>,
    pub(crate) verified_at: Option<DateTime<Utc>>,
    pub(crate) verified_by: Option<Actor>,
    pub(crate) shipping_info: ShippingInfo,
    pub(crate) timeline: Timeline,
    pub(crate) refund: Option<Refund>,
    pub(crate) priority: Priority,
    pub(crate) tags: Vec<String>,
    pub(crate) archived: bool,
    pub(crate) archived_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            order_number: String::new(),
            user_id: UserId::from_uuid(Uuid::nil()),
            items: Vec::new(),
            shipping_address: Address::default(),
            billing_address: Address::default(),
            payment_method: PaymentMethod::default(),
            transaction_proof: String::new(),
            pricing: Pricing::default(),
            status: OrderStatus::PendingVerification,
            payment_status: PaymentStatus::Pending,
            verification_deadline: None,
            verification_notes: None,
            admin_notes: None,
            notes: None,
            verified_at: None,
            verified_by: None,
            shipping_info: ShippingInfo::default(),
            timeline: Timeline::new(),
            refund: None,
            priority: Priority::default(),
            tags: Vec::new(),
            archived: false,
            archived_at: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn payment_method(&self) -> &PaymentMethod {
        &self.payment_method
    }

    pub fn transaction_proof(&self) -> &str {
        &self.transaction_proof
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn verification_deadline(&self) -> Option<DateTime<Utc>> {
        self.verification_deadline
    }

    pub fn verification_notes(&self) -> Option<&str> {
        self.verification_notes.as_deref()
    }

    pub fn admin_notes(&self) -> Option<&str> {
        self.admin_notes.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn verified_by(&self) -> Option<Actor> {
        self.verified_by
    }

    pub fn shipping_info(&self) -> &ShippingInfo {
        &self.shipping_info
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn refund(&self) -> Option<&Refund> {
        self.refund.as_ref()
    }

    pub fn refund_requested(&self) -> bool {
        self.refund.is_some()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_placed(&self) -> bool {
        !self.order_number.is_empty()
    }

    /// Whole days since the order was placed.
    pub fn order_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    /// Sum of item quantities.
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn is_verification_expired(&self, now: DateTime<Utc>) -> bool {
        expiry::is_expired(self, now)
    }

    pub fn days_until_deadline(&self, now: DateTime<Utc>) -> Option<i64> {
        expiry::days_until_deadline(self, now)
    }

    /// Pre-persistence step: recompute derived values and re-check the
    /// invariants that must hold on every write.
    pub fn validate_and_normalize(&mut self) -> OrderResult<()> {
        self.ensure_placed()?;

        for (index, item) in self.items.iter_mut().enumerate() {
            item.recompute_subtotal(index)?;
        }

        self.pricing.validate()?;

        if let Some(amount) = self.refund.as_ref().and_then(|r| r.amount) {
            if amount > self.pricing.total {
                return Err(OrderError::invariant(format!(
                    "refund amount {amount} exceeds order total {}",
                    self.pricing.total
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn ensure_placed(&self) -> OrderResult<()> {
        if !self.is_placed() {
            return Err(OrderError::NotPlaced);
        }
        Ok(())
    }

    pub(crate) fn ensure_order_id(&self, order_id: OrderId) -> OrderResult<()> {
        if self.id != order_id {
            return Err(OrderError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    /// Common guard for commands against an existing order.
    pub(crate) fn ensure_target(&self, order_id: OrderId) -> OrderResult<()> {
        self.ensure_placed()?;
        self.ensure_order_id(order_id)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = OrderError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.order_number = e.order_number.clone();
                self.user_id = e.user_id;
                self.items = e.items.clone();
                self.shipping_address = e.shipping_address.clone();
                self.billing_address = e.billing_address.clone();
                self.payment_method = e.payment_method.clone();
                self.transaction_proof = e.transaction_proof.clone();
                self.pricing = e.pricing;
                self.notes = e.notes.clone();
                self.verification_deadline = e.verification_deadline;
                self.status = OrderStatus::PendingVerification;
                self.payment_status = PaymentStatus::Pending;
                self.created_at = e.occurred_at;
                self.timeline.record(
                    OrderStatus::PendingVerification.into(),
                    PLACED_NOTE.to_string(),
                    Actor::Customer(e.user_id),
                    e.occurred_at,
                );
            }
            OrderEvent::PaymentVerified(e) => {
                self.payment_status = PaymentStatus::Verified;
                self.verification_notes = e.notes.clone();
                self.verified_at = Some(e.occurred_at);
                self.verified_by = Some(e.verified_by);
            }
            OrderEvent::PaymentRejected(e) => {
                self.payment_status = PaymentStatus::Rejected;
                self.verification_notes = e.notes.clone();
                self.verified_at = Some(e.occurred_at);
                self.verified_by = Some(e.rejected_by);
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.timeline.record(
                    e.to.into(),
                    e.note.clone(),
                    e.changed_by,
                    e.occurred_at,
                );
            }
            OrderEvent::ShipmentRecorded(e) => {
                self.shipping_info.merge(&e.shipping);
                self.shipping_info.shipped_at = Some(e.occurred_at);
            }
            OrderEvent::DeliveryConfirmed(e) => {
                self.shipping_info.actual_delivery = Some(e.occurred_at);
            }
            OrderEvent::RefundRequested(e) => {
                self.refund = Some(Refund::opened(e));
                self.timeline.record(
                    TimelineStatus::RefundRequested,
                    format!("Refund requested: {}", e.reason),
                    e.requested_by,
                    e.occurred_at,
                );
            }
            OrderEvent::RefundResolved(e) => {
                if let Some(refund) = self.refund.as_mut() {
                    refund.resolve(e);
                }
                let (marker, note) = match e.decision {
                    RefundDecision::Approved => (TimelineStatus::RefundApproved, "Refund approved"),
                    RefundDecision::Rejected => (TimelineStatus::RefundRejected, "Refund rejected"),
                };
                self.timeline
                    .record(marker, note.to_string(), e.resolved_by, e.occurred_at);
            }
            OrderEvent::RefundProcessed(e) => {
                if let Some(refund) = self.refund.as_mut() {
                    refund.process(e);
                }
                self.payment_status = PaymentStatus::Refunded;
            }
            OrderEvent::NotesUpdated(e) => {
                let slot = match e.field {
                    NoteField::Verification => &mut self.verification_notes,
                    NoteField::Admin => &mut self.admin_notes,
                    NoteField::Customer => &mut self.notes,
                };
                *slot = e.text.clone();
            }
            OrderEvent::PriorityChanged(e) => {
                self.priority = e.priority;
            }
            OrderEvent::TagsUpdated(e) => {
                self.tags = e.tags.clone();
            }
            OrderEvent::OrderArchived(e) => {
                self.archived = true;
                self.archived_at = Some(e.occurred_at);
            }
        }

        self.updated_at = event.occurred_at();
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::VerifyPayment(cmd) => self.handle_verify_payment(cmd),
            OrderCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
            OrderCommand::MarkProcessing(cmd) => self.handle_mark_processing(cmd),
            OrderCommand::ShipOrder(cmd) => self.handle_ship(cmd),
            OrderCommand::DeliverOrder(cmd) => self.handle_deliver(cmd),
            OrderCommand::RequestRefund(cmd) => self.handle_request_refund(cmd),
            OrderCommand::ResolveRefund(cmd) => self.handle_resolve_refund(cmd),
            OrderCommand::ProcessRefund(cmd) => self.handle_process_refund(cmd),
            OrderCommand::UpdateNotes(cmd) => self.handle_update_notes(cmd),
            OrderCommand::SetPriority(cmd) => self.handle_set_priority(cmd),
            OrderCommand::SetTags(cmd) => self.handle_set_tags(cmd),
            OrderCommand::ArchiveOrder(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Order {
    fn handle_place(&self, cmd: &PlaceOrder) -> OrderResult<Vec<OrderEvent>> {
        if self.is_placed() {
            return Err(OrderError::invariant("order already exists"));
        }
        self.ensure_order_id(cmd.order_id)?;

        let order_number = cmd.order_number.trim();
        if order_number.is_empty() {
            return Err(OrderError::validation("order_number is required"));
        }

        if cmd.items.is_empty() {
            return Err(OrderError::validation("order must contain at least one item"));
        }
        let items = cmd
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| OrderItem::from_new(index, item))
            .collect::<OrderResult<Vec<_>>>()?;

        cmd.shipping_address.validate("shipping_address", true)?;
        cmd.billing_address.validate("billing_address", false)?;
        cmd.payment_method.validate()?;

        let proof = cmd.transaction_proof.trim();
        if proof.is_empty() {
            return Err(OrderError::validation("transaction_proof is required"));
        }

        cmd.pricing.validate()?;

        if let Some(deadline) = cmd.verification_deadline {
            if deadline < cmd.occurred_at {
                return Err(OrderError::validation(
                    "verification_deadline cannot precede placement",
                ));
            }
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_number: order_number.to_string(),
            user_id: cmd.user_id,
            items,
            shipping_address: cmd.shipping_address.clone(),
            billing_address: cmd.billing_address.clone(),
            payment_method: cmd.payment_method.clone(),
            transaction_proof: proof.to_string(),
            pricing: cmd.pricing,
            notes: normalize_text(cmd.notes.as_deref()),
            verification_deadline: cmd.verification_deadline,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_notes(&self, cmd: &UpdateNotes) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        let text = normalize_text(cmd.text.as_deref());
        let current = match cmd.field {
            NoteField::Verification => &self.verification_notes,
            NoteField::Admin => &self.admin_notes,
            NoteField::Customer => &self.notes,
        };
        if *current == text {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::NotesUpdated(NotesUpdated {
            order_id: cmd.order_id,
            field: cmd.field,
            text,
            updated_by: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_priority(&self, cmd: &SetPriority) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        if self.priority == cmd.priority {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::PriorityChanged(PriorityChanged {
            order_id: cmd.order_id,
            priority: cmd.priority,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_tags(&self, cmd: &SetTags) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        let mut tags: Vec<String> = Vec::with_capacity(cmd.tags.len());
        for tag in &cmd.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        if tags == self.tags {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::TagsUpdated(TagsUpdated {
            order_id: cmd.order_id,
            tags,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveOrder) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        if self.archived {
            return Err(OrderError::AlreadyArchived);
        }
        if !self.status.is_closed() {
            return Err(OrderError::ArchiveNotAllowed {
                status: self.status,
            });
        }

        Ok(vec![OrderEvent::OrderArchived(OrderArchived {
            order_id: cmd.order_id,
            archived_by: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Trim free text; blank becomes `None`.
pub(crate) fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

//! Transition engine: the single place a status change is decided.
//!
//! Workflows call [`Order::transition`] for their status step; the generic
//! admin path ([`UpdateStatus`]) is routed to the workflow owning the target.

use chrono::{DateTime, Utc};

use crate::command::{DeliverOrder, MarkProcessing, ShipOrder, UpdateStatus};
use crate::error::{OrderError, OrderResult};
use crate::event::{OrderEvent, StatusChanged};
use crate::order::Order;
use crate::status::OrderStatus;
use crate::value_objects::Actor;

impl Order {
    /// Decide a `StatusChanged` event for `target`.
    ///
    /// Re-applying the current status decides nothing. Anything off the
    /// status graph, or stamped before the newest timeline entry, is
    /// rejected without touching the order.
    pub(crate) fn transition(
        &self,
        target: OrderStatus,
        note: Option<&str>,
        actor: Actor,
        at: DateTime<Utc>,
    ) -> OrderResult<Vec<OrderEvent>> {
        if self.status == target {
            return Ok(vec![]);
        }
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.timeline.ensure_accepts(at)?;

        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Status changed to {target}"));

        Ok(vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: self.id,
            from: self.status,
            to: target,
            note,
            changed_by: actor,
            occurred_at: at,
        })])
    }

    pub(crate) fn handle_update_status(&self, cmd: &UpdateStatus) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        let target = cmd.target;
        if self.status == target {
            return Ok(vec![]);
        }
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        match target {
            OrderStatus::Verified => Err(OrderError::WorkflowRequired {
                to: target,
                workflow: "payment verification",
            }),
            OrderStatus::Refunded => Err(OrderError::WorkflowRequired {
                to: target,
                workflow: "refund",
            }),
            OrderStatus::Processing => self.handle_mark_processing(&MarkProcessing {
                order_id: cmd.order_id,
                actor: cmd.actor,
                occurred_at: cmd.occurred_at,
            }),
            OrderStatus::Shipped => self.handle_ship(&ShipOrder {
                order_id: cmd.order_id,
                shipping: cmd.shipping.clone().unwrap_or_default(),
                actor: cmd.actor,
                occurred_at: cmd.occurred_at,
            }),
            OrderStatus::Delivered => self.handle_deliver(&DeliverOrder {
                order_id: cmd.order_id,
                actor: cmd.actor,
                occurred_at: cmd.occurred_at,
            }),
            OrderStatus::Cancelled => {
                self.transition(target, cmd.note.as_deref(), cmd.actor, cmd.occurred_at)
            }
            // No edge leads back here; rejected above.
            OrderStatus::PendingVerification => Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            }),
        }
    }
}

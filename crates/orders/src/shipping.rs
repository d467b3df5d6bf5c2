//! Fulfilment steps: processing, shipping, delivery.

use crate::command::{DeliverOrder, MarkProcessing, ShipOrder};
use crate::error::{OrderError, OrderResult};
use crate::event::{DeliveryConfirmed, OrderEvent, ShipmentRecorded};
use crate::order::Order;
use crate::status::OrderStatus;

impl Order {
    /// Guard for a fulfilment step from `required` to `target`.
    fn require_status(&self, required: OrderStatus, target: OrderStatus) -> OrderResult<()> {
        if self.status == target {
            return Err(OrderError::AlreadyInState {
                status: self.status,
            });
        }
        if self.status != required {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    pub(crate) fn handle_mark_processing(&self, cmd: &MarkProcessing) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;
        self.require_status(OrderStatus::Verified, OrderStatus::Processing)?;

        self.transition(OrderStatus::Processing, None, cmd.actor, cmd.occurred_at)
    }

    pub(crate) fn handle_ship(&self, cmd: &ShipOrder) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;
        self.require_status(OrderStatus::Processing, OrderStatus::Shipped)?;

        let note = cmd.shipping.shipment_note();
        let status_change =
            self.transition(OrderStatus::Shipped, Some(&note), cmd.actor, cmd.occurred_at)?;

        let mut events = vec![OrderEvent::ShipmentRecorded(ShipmentRecorded {
            order_id: cmd.order_id,
            shipping: cmd.shipping.clone(),
            occurred_at: cmd.occurred_at,
        })];
        events.extend(status_change);
        Ok(events)
    }

    pub(crate) fn handle_deliver(&self, cmd: &DeliverOrder) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;
        self.require_status(OrderStatus::Shipped, OrderStatus::Delivered)?;

        let status_change =
            self.transition(OrderStatus::Delivered, None, cmd.actor, cmd.occurred_at)?;

        let mut events = vec![OrderEvent::DeliveryConfirmed(DeliveryConfirmed {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })];
        events.extend(status_change);
        Ok(events)
    }
}

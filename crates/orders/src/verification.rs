//! Manual payment verification: a reviewer approves or rejects the uploaded
//! bank-transfer proof of a `pending_verification` order.

use crate::command::VerifyPayment;
use crate::error::{OrderError, OrderResult};
use crate::event::{OrderEvent, PaymentRejected, PaymentVerified};
use crate::order::{Order, normalize_text};
use crate::status::{OrderStatus, PaymentStatus};

pub(crate) const APPROVED_NOTE: &str = "Payment verified and approved";

impl Order {
    pub(crate) fn handle_verify_payment(&self, cmd: &VerifyPayment) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        if self.payment_status != PaymentStatus::Pending {
            return Err(OrderError::AlreadyVerified {
                payment_status: self.payment_status,
            });
        }

        let target = if cmd.approved {
            OrderStatus::Verified
        } else {
            OrderStatus::Cancelled
        };
        if self.status != OrderStatus::PendingVerification {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        let notes = normalize_text(Some(&cmd.notes));
        let (payment, note) = if cmd.approved {
            let event = OrderEvent::PaymentVerified(PaymentVerified {
                order_id: cmd.order_id,
                notes: notes.clone(),
                verified_by: cmd.actor,
                occurred_at: cmd.occurred_at,
            });
            (event, APPROVED_NOTE.to_string())
        } else {
            let note = match &notes {
                Some(reason) => format!("Payment rejected: {reason}"),
                None => "Payment rejected".to_string(),
            };
            let event = OrderEvent::PaymentRejected(PaymentRejected {
                order_id: cmd.order_id,
                notes: notes.clone(),
                rejected_by: cmd.actor,
                occurred_at: cmd.occurred_at,
            });
            (event, note)
        };

        let mut events = vec![payment];
        events.extend(self.transition(target, Some(&note), cmd.actor, cmd.occurred_at)?);
        Ok(events)
    }
}

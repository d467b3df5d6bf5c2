//! Refund sub-workflow: request, resolve, process.
//!
//! The refund lives on the order as an embedded record. Only processing it
//! touches the order status (`delivered -> refunded`); request and resolve
//! just add timeline markers.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::{ProcessRefund, RequestRefund, ResolveRefund};
use crate::error::{OrderError, OrderResult};
use crate::event::{OrderEvent, RefundProcessed, RefundRequested, RefundResolved};
use crate::order::Order;
use crate::status::OrderStatus;
use crate::value_objects::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
}

impl RefundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Approved => "approved",
            RefundStatus::Rejected => "rejected",
            RefundStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin decision on a pending refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundDecision {
    Approved,
    Rejected,
}

impl RefundDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            RefundDecision::Approved => "approved",
            RefundDecision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RefundDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RefundDecision> for RefundStatus {
    fn from(decision: RefundDecision) -> Self {
        match decision {
            RefundDecision::Approved => RefundStatus::Approved,
            RefundDecision::Rejected => RefundStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub requested_at: DateTime<Utc>,
    pub requested_by: Actor,
    pub reason: String,
    pub status: RefundStatus,
    /// Set once processed, in minor currency units.
    pub amount: Option<u64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Actor>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Actor>,
}

impl Refund {
    pub(crate) fn opened(event: &RefundRequested) -> Self {
        Self {
            requested_at: event.occurred_at,
            requested_by: event.requested_by,
            reason: event.reason.clone(),
            status: RefundStatus::Pending,
            amount: None,
            resolved_at: None,
            resolved_by: None,
            processed_at: None,
            processed_by: None,
        }
    }

    pub(crate) fn resolve(&mut self, event: &RefundResolved) {
        self.status = event.decision.into();
        self.resolved_at = Some(event.occurred_at);
        self.resolved_by = Some(event.resolved_by);
    }

    pub(crate) fn process(&mut self, event: &RefundProcessed) {
        self.status = RefundStatus::Processed;
        self.amount = Some(event.amount);
        self.processed_at = Some(event.occurred_at);
        self.processed_by = Some(event.processed_by);
    }
}

impl Order {
    pub(crate) fn handle_request_refund(&self, cmd: &RequestRefund) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        if self.status != OrderStatus::Delivered {
            return Err(OrderError::RefundNotEligible {
                status: self.status,
            });
        }

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(OrderError::validation("refund reason is required"));
        }

        if let Some(refund) = &self.refund {
            if refund.status != RefundStatus::Rejected {
                return Err(OrderError::RefundAlreadyRequested {
                    status: refund.status,
                });
            }
        }

        self.timeline.ensure_accepts(cmd.occurred_at)?;

        Ok(vec![OrderEvent::RefundRequested(RefundRequested {
            order_id: cmd.order_id,
            reason: reason.to_string(),
            requested_by: cmd.requested_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    pub(crate) fn handle_resolve_refund(&self, cmd: &ResolveRefund) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        let refund = self.refund.as_ref().ok_or(OrderError::RefundNotRequested)?;
        if refund.status != RefundStatus::Pending {
            // Approval stays recorded once the refund has been processed.
            let same_decision = match cmd.decision {
                RefundDecision::Approved => matches!(
                    refund.status,
                    RefundStatus::Approved | RefundStatus::Processed
                ),
                RefundDecision::Rejected => refund.status == RefundStatus::Rejected,
            };
            return Err(if same_decision {
                OrderError::RefundAlreadyResolved {
                    status: refund.status,
                }
            } else {
                OrderError::RefundDecisionConflict {
                    status: refund.status,
                    decision: cmd.decision,
                }
            });
        }

        self.timeline.ensure_accepts(cmd.occurred_at)?;

        Ok(vec![OrderEvent::RefundResolved(RefundResolved {
            order_id: cmd.order_id,
            decision: cmd.decision,
            resolved_by: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    pub(crate) fn handle_process_refund(&self, cmd: &ProcessRefund) -> OrderResult<Vec<OrderEvent>> {
        self.ensure_target(cmd.order_id)?;

        let status = self.refund.as_ref().map(|r| r.status);
        match status {
            Some(RefundStatus::Processed) => return Err(OrderError::RefundAlreadyProcessed),
            Some(RefundStatus::Approved) => {}
            other => return Err(OrderError::RefundNotApproved { status: other }),
        }

        if cmd.amount > self.pricing.total {
            return Err(OrderError::InvalidRefundAmount {
                amount: cmd.amount,
                total: self.pricing.total,
            });
        }

        let note = format!("Refund of {} processed", cmd.amount);
        let mut events = vec![OrderEvent::RefundProcessed(RefundProcessed {
            order_id: cmd.order_id,
            amount: cmd.amount,
            processed_by: cmd.actor,
            occurred_at: cmd.occurred_at,
        })];
        events.extend(self.transition(
            OrderStatus::Refunded,
            Some(&note),
            cmd.actor,
            cmd.occurred_at,
        )?);
        Ok(events)
    }
}

//! Order rejection reasons.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::refund::{RefundDecision, RefundStatus};
use crate::status::{OrderStatus, PaymentStatus};

pub type OrderResult<T> = Result<T, OrderError>;

/// Every way an order command can be rejected.
///
/// Each variant carries the state that explains the rejection (current
/// status, attempted target) so callers can report it without reloading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Malformed or missing input, or a pricing mismatch at placement.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The status graph has no edge `from -> to`.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The edge exists but is reserved for a dedicated workflow.
    #[error("transition to {to} is only possible through the {workflow} workflow")]
    WorkflowRequired {
        to: OrderStatus,
        workflow: &'static str,
    },

    #[error("payment has already been resolved (payment status: {payment_status})")]
    AlreadyVerified { payment_status: PaymentStatus },

    #[error("order is already {status}")]
    AlreadyInState { status: OrderStatus },

    #[error("no refund has been requested for this order")]
    RefundNotRequested,

    #[error("refund must be approved before it can be processed")]
    RefundNotApproved { status: Option<RefundStatus> },

    #[error("refunds can only be requested for delivered orders (order is {status})")]
    RefundNotEligible { status: OrderStatus },

    #[error("a refund is already open for this order (refund status: {status})")]
    RefundAlreadyRequested { status: RefundStatus },

    #[error("refund has already been resolved (refund status: {status})")]
    RefundAlreadyResolved { status: RefundStatus },

    /// The refund was resolved the other way; the new decision is not recorded.
    #[error("refund was already resolved as {status}, cannot record {decision}")]
    RefundDecisionConflict {
        status: RefundStatus,
        decision: RefundDecision,
    },

    #[error("refund has already been processed")]
    RefundAlreadyProcessed,

    #[error("refund amount {amount} exceeds order total {total}")]
    InvalidRefundAmount { amount: u64, total: u64 },

    #[error("timeline entry at {attempted} would precede the last entry at {last}")]
    OutOfOrderTimestamp {
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    #[error("order is already archived")]
    AlreadyArchived,

    #[error("only delivered, cancelled or refunded orders can be archived (order is {status})")]
    ArchiveNotAllowed { status: OrderStatus },

    #[error("order has not been placed")]
    NotPlaced,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Double-submit signals: the order is already past the gate the caller
    /// was trying to move it through. Nothing was changed.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            OrderError::AlreadyVerified { .. }
                | OrderError::AlreadyInState { .. }
                | OrderError::RefundAlreadyRequested { .. }
                | OrderError::RefundAlreadyResolved { .. }
                | OrderError::RefundAlreadyProcessed
        )
    }
}

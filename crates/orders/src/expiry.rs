//! Read-only verification deadline evaluation. Never changes an order; the
//! sweep that cancels expired orders lives outside this crate.

use chrono::{DateTime, Duration, Utc};

use crate::order::Order;
use crate::status::{OrderStatus, PaymentStatus};

/// `true` once `now` is strictly past the verification deadline.
pub fn is_expired(order: &Order, now: DateTime<Utc>) -> bool {
    order
        .verification_deadline()
        .is_some_and(|deadline| now > deadline)
}

/// Whole days left until the deadline, rounded up; negative once overdue.
/// `None` when the order has no deadline.
pub fn days_until_deadline(order: &Order, now: DateTime<Utc>) -> Option<i64> {
    let deadline = order.verification_deadline()?;
    let remaining = deadline - now;

    // num_days truncates toward zero, which is already the ceiling when overdue.
    let whole = remaining.num_days();
    Some(if remaining - Duration::days(whole) > Duration::zero() {
        whole + 1
    } else {
        whole
    })
}

/// An expired order whose payment was never reviewed.
pub fn is_sweep_candidate(order: &Order, now: DateTime<Utc>) -> bool {
    order.payment_status() == PaymentStatus::Pending
        && order.status() == OrderStatus::PendingVerification
        && !order.is_archived()
        && is_expired(order, now)
}

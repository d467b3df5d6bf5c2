//! Order listing filters and pagination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::UserId;
use folio_orders::{Order, OrderStatus, PaymentStatus};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1000;

/// Pagination parameters for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of orders to return.
    pub limit: u32,
    /// 0-based offset.
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria. Unset fields match everything; archived orders are
/// excluded unless asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuery {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// Only orders whose verification deadline is strictly before this.
    pub deadline_before: Option<DateTime<Utc>>,
    pub include_archived: bool,
    pub pagination: Pagination,
}

impl OrderQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Orders still awaiting review whose deadline has passed.
    pub fn expired_pending(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(OrderStatus::PendingVerification),
            payment_status: Some(PaymentStatus::Pending),
            deadline_before: Some(now),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        if !self.include_archived && order.is_archived() {
            return false;
        }
        if self.user_id.is_some_and(|u| u != order.user_id()) {
            return false;
        }
        if self.status.is_some_and(|s| s != order.status()) {
            return false;
        }
        if self.payment_status.is_some_and(|s| s != order.payment_status()) {
            return false;
        }
        if self.created_after.is_some_and(|t| order.created_at() < t) {
            return false;
        }
        if self.created_before.is_some_and(|t| order.created_at() >= t) {
            return false;
        }
        if let Some(cutoff) = self.deadline_before {
            match order.verification_deadline() {
                Some(deadline) if deadline < cutoff => {}
                _ => return false,
            }
        }
        true
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    /// Orders matching the filter across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl OrderPage {
    /// Cut a page out of an already filtered and sorted list.
    pub fn paginate(matching: Vec<Order>, pagination: Pagination) -> Self {
        let total = matching.len() as u64;
        let offset = pagination.offset as usize;
        let orders: Vec<Order> = matching
            .into_iter()
            .skip(offset)
            .take(pagination.limit as usize)
            .collect();
        let has_more = (offset + orders.len()) < total as usize;

        Self {
            orders,
            total,
            pagination,
            has_more,
        }
    }
}

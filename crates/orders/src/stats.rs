//! Order counts and revenue for dashboards.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use folio_core::UserId;

use crate::order::Order;
use crate::status::OrderStatus;

/// Aggregated counters over a set of orders, optionally one customer's.
///
/// `total_revenue` sums `pricing.total` over every counted order, whatever
/// its status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub total_revenue: u64,
    pub pending_orders: u64,
    pub verified_orders: u64,
    pub processing_orders: u64,
    pub shipped_orders: u64,
    pub delivered_orders: u64,
    pub cancelled_orders: u64,
    pub refunded_orders: u64,
}

impl OrderStats {
    pub fn from_orders<'a, I>(orders: I, user_id: Option<UserId>) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut stats = Self::default();
        for order in orders {
            if user_id.is_some_and(|u| u != order.user_id()) {
                continue;
            }
            stats.count(Some(order.status()), order.pricing().total);
        }
        stats
    }

    /// Aggregate stored documents without deserializing full orders.
    ///
    /// Missing or malformed totals count as 0; a missing or unknown status
    /// still counts toward `total_orders` but no status bucket.
    pub fn from_documents<'a, I>(documents: I, user_id: Option<UserId>) -> Self
    where
        I: IntoIterator<Item = &'a JsonValue>,
    {
        let user_filter = user_id.map(|u| u.to_string());

        let mut stats = Self::default();
        for doc in documents {
            if let Some(user) = &user_filter {
                if doc.get("user_id").and_then(JsonValue::as_str) != Some(user.as_str()) {
                    continue;
                }
            }

            let status = doc
                .get("status")
                .and_then(JsonValue::as_str)
                .and_then(|s| s.parse::<OrderStatus>().ok());
            let total = doc
                .get("pricing")
                .and_then(|p| p.get("total"))
                .and_then(JsonValue::as_u64)
                .unwrap_or(0);

            stats.count(status, total);
        }
        stats
    }

    fn count(&mut self, status: Option<OrderStatus>, total: u64) {
        self.total_orders += 1;
        self.total_revenue = self.total_revenue.saturating_add(total);

        let Some(status) = status else { return };
        let bucket = match status {
            OrderStatus::PendingVerification => &mut self.pending_orders,
            OrderStatus::Verified => &mut self.verified_orders,
            OrderStatus::Processing => &mut self.processing_orders,
            OrderStatus::Shipped => &mut self.shipped_orders,
            OrderStatus::Delivered => &mut self.delivered_orders,
            OrderStatus::Cancelled => &mut self.cancelled_orders,
            OrderStatus::Refunded => &mut self.refunded_orders,
        };
        *bucket += 1;
    }
}

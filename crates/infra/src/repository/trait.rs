use std::sync::Arc;

use serde_json::Value as JsonValue;

use folio_core::{ExpectedVersion, OrderId, UserId};
use folio_orders::Order;

use super::RepositoryError;
use super::query::{OrderPage, OrderQuery};

/// Document store for orders.
///
/// Implementations must:
/// - keep `order_number` unique across all orders
/// - compare the stored version against `expected` and write atomically
///   (`save` either replaces the whole document or changes nothing)
/// - never let a save change an order's number
pub trait OrderRepository: Send + Sync {
    /// Store a newly placed order.
    fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Load an order by id. `None` when it does not exist.
    fn load(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError>;

    /// Replace a stored order if its stored version matches `expected`.
    fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), RepositoryError>;

    /// Filtered, paginated listing ordered by `created_at` (oldest first).
    fn query(&self, query: &OrderQuery) -> Result<OrderPage, RepositoryError>;

    /// Raw stored documents, optionally one customer's, for tolerant
    /// aggregation.
    fn documents(&self, user_id: Option<UserId>) -> Result<Vec<JsonValue>, RepositoryError>;
}

impl<R> OrderRepository for Arc<R>
where
    R: OrderRepository + ?Sized,
{
    fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        (**self).insert(order)
    }

    fn load(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        (**self).load(id)
    }

    fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        (**self).find_by_number(order_number)
    }

    fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        (**self).save(order, expected)
    }

    fn query(&self, query: &OrderQuery) -> Result<OrderPage, RepositoryError> {
        (**self).query(query)
    }

    fn documents(&self, user_id: Option<UserId>) -> Result<Vec<JsonValue>, RepositoryError> {
        (**self).documents(user_id)
    }
}

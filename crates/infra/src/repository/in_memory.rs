use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use folio_core::{AggregateRoot, ExpectedVersion, OrderId, UserId};
use folio_orders::Order;

use super::RepositoryError;
use super::query::{OrderPage, OrderQuery};
use super::r#trait::OrderRepository;

#[derive(Debug)]
struct StoredOrder {
    version: u64,
    document: JsonValue,
}

#[derive(Debug, Default)]
struct Documents {
    orders: HashMap<OrderId, StoredOrder>,
    by_number: HashMap<String, OrderId>,
}

/// In-memory order document store.
///
/// Intended for tests/dev. Documents and the order number index sit behind
/// one lock, so uniqueness and version checks are atomic with the write.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    state: RwLock<Documents>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(document: &JsonValue) -> Result<Order, RepositoryError> {
        Ok(serde_json::from_value(document.clone())?)
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let id = order.id_typed();
        let document = serde_json::to_value(order)?;

        let mut state = self.state.write().map_err(|_| RepositoryError::Poisoned)?;

        if state.orders.contains_key(&id) {
            return Err(RepositoryError::DuplicateOrderId(id));
        }
        if state.by_number.contains_key(order.order_number()) {
            return Err(RepositoryError::DuplicateOrderNumber(
                order.order_number().to_string(),
            ));
        }

        state.by_number.insert(order.order_number().to_string(), id);
        state.orders.insert(
            id,
            StoredOrder {
                version: order.version(),
                document,
            },
        );
        Ok(())
    }

    fn load(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.read().map_err(|_| RepositoryError::Poisoned)?;
        state
            .orders
            .get(&id)
            .map(|stored| Self::decode(&stored.document))
            .transpose()
    }

    fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.read().map_err(|_| RepositoryError::Poisoned)?;
        state
            .by_number
            .get(order_number)
            .and_then(|id| state.orders.get(id))
            .map(|stored| Self::decode(&stored.document))
            .transpose()
    }

    fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let id = order.id_typed();
        let document = serde_json::to_value(order)?;

        let mut state = self.state.write().map_err(|_| RepositoryError::Poisoned)?;
        let stored = state
            .orders
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;

        if !expected.matches(stored.version) {
            return Err(RepositoryError::Concurrency(format!(
                "order {id}: expected {expected:?}, found {}",
                stored.version
            )));
        }

        let stored_number = stored.document.get("order_number").and_then(JsonValue::as_str);
        if stored_number != Some(order.order_number()) {
            return Err(RepositoryError::InvalidWrite(format!(
                "order {id}: order number cannot change"
            )));
        }
        if order.version() <= stored.version {
            return Err(RepositoryError::InvalidWrite(format!(
                "order {id}: version must advance past {}",
                stored.version
            )));
        }

        stored.version = order.version();
        stored.document = document;
        Ok(())
    }

    fn query(&self, query: &OrderQuery) -> Result<OrderPage, RepositoryError> {
        let state = self.state.read().map_err(|_| RepositoryError::Poisoned)?;

        let mut matching = Vec::new();
        for stored in state.orders.values() {
            let order = Self::decode(&stored.document)?;
            if query.matches(&order) {
                matching.push(order);
            }
        }
        drop(state);

        matching.sort_by_key(|o| (o.created_at(), o.id_typed()));
        Ok(OrderPage::paginate(matching, query.pagination))
    }

    fn documents(&self, user_id: Option<UserId>) -> Result<Vec<JsonValue>, RepositoryError> {
        let user = user_id.map(|u| u.to_string());
        let state = self.state.read().map_err(|_| RepositoryError::Poisoned)?;

        Ok(state
            .orders
            .values()
            .filter(|stored| match &user {
                Some(user) => {
                    stored.document.get("user_id").and_then(JsonValue::as_str)
                        == Some(user.as_str())
                }
                None => true,
            })
            .map(|stored| stored.document.clone())
            .collect())
    }
}

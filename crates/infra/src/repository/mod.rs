//! Order persistence boundary.
//!
//! Orders are stored as whole documents (timeline and refund embedded) and
//! written with a compare-and-set on the aggregate version, so two writers
//! that loaded the same version cannot both win.

pub mod in_memory;
pub mod query;
pub mod r#trait;

use folio_core::OrderId;
use thiserror::Error;

pub use in_memory::InMemoryOrderRepository;
pub use query::{OrderPage, OrderQuery, Pagination};
pub use r#trait::OrderRepository;

/// Repository operation error.
///
/// These are storage failures (races, uniqueness, corrupt documents) as
/// opposed to domain rejections, which never reach the repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("order number '{0}' is already taken")]
    DuplicateOrderNumber(String),

    #[error("order {0} already exists")]
    DuplicateOrderId(OrderId),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("order document could not be (de)serialized: {0}")]
    Serialization(String),

    #[error("invalid write: {0}")]
    InvalidWrite(String),

    #[error("repository lock poisoned")]
    Poisoned,
}

impl From<serde_json::Error> for RepositoryError {
    fn from(value: serde_json::Error) -> Self {
        RepositoryError::Serialization(value.to_string())
    }
}

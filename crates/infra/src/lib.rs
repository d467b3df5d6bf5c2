//! Infrastructure layer: persistence port and adapter, order numbering,
//! clock, configuration and the service that runs order commands end to end.

pub mod clock;
pub mod config;
pub mod order_number;
pub mod order_service;
pub mod repository;

mod integration_tests;
#[cfg(test)]
mod test_support;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::OrdersConfig;
pub use order_number::{DefaultOrderNumberGenerator, OrderNumberGenerator};
pub use order_service::{NewOrder, OrderService, OrderServiceError};
pub use repository::{
    InMemoryOrderRepository, OrderPage, OrderQuery, OrderRepository, Pagination, RepositoryError,
};

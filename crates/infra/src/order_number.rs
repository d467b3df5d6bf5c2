//! Human-readable order numbers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Produces candidate order numbers. Uniqueness is enforced by the
/// repository; the service retries with a fresh candidate on collision.
///
/// `prefix` comes from [`OrdersConfig`](crate::config::OrdersConfig).
pub trait OrderNumberGenerator: Send + Sync {
    fn generate(&self, prefix: &str, now: DateTime<Utc>) -> String;
}

impl<G> OrderNumberGenerator for Arc<G>
where
    G: OrderNumberGenerator + ?Sized,
{
    fn generate(&self, prefix: &str, now: DateTime<Utc>) -> String {
        (**self).generate(prefix, now)
    }
}

/// `<prefix>-<YYYYMMDD>-<8 hex chars>`, e.g. `ORD-20240501-3FA85F64`.
///
/// The suffix is taken from the random tail of a UUIDv7.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOrderNumberGenerator;

impl OrderNumberGenerator for DefaultOrderNumberGenerator {
    fn generate(&self, prefix: &str, now: DateTime<Utc>) -> String {
        let hex = Uuid::now_v7().simple().to_string();
        let suffix = hex[hex.len() - 8..].to_ascii_uppercase();
        format!("{prefix}-{}-{suffix}", now.format("%Y%m%d"))
    }
}

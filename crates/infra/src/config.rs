//! Order service configuration.

use anyhow::{Context, ensure};
use chrono::Duration;

pub const ENV_VERIFICATION_WINDOW_HOURS: &str = "FOLIO_VERIFICATION_WINDOW_HOURS";
pub const ENV_ORDER_NUMBER_PREFIX: &str = "FOLIO_ORDER_NUMBER_PREFIX";
pub const ENV_ORDER_NUMBER_ATTEMPTS: &str = "FOLIO_ORDER_NUMBER_ATTEMPTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdersConfig {
    /// Time a reviewer has to verify a payment after placement.
    pub verification_window: Duration,
    pub order_number_prefix: String,
    /// How many order numbers to try before giving up on a placement.
    pub max_order_number_attempts: u32,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            verification_window: Duration::hours(48),
            order_number_prefix: "ORD".to_string(),
            max_order_number_attempts: 5,
        }
    }
}

impl OrdersConfig {
    pub fn with_verification_window(mut self, window: Duration) -> Self {
        self.verification_window = window;
        self
    }

    pub fn with_order_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.order_number_prefix = prefix.into();
        self
    }

    pub fn with_max_order_number_attempts(mut self, attempts: u32) -> Self {
        self.max_order_number_attempts = attempts;
        self
    }

    /// Read overrides from the process environment. Unset variables keep
    /// their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_VERIFICATION_WINDOW_HOURS) {
            let hours: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_VERIFICATION_WINDOW_HOURS}={raw:?} is not a number"))?;
            ensure!(hours > 0, "{ENV_VERIFICATION_WINDOW_HOURS} must be positive, got {hours}");
            config.verification_window = Duration::try_hours(hours)
                .with_context(|| format!("{ENV_VERIFICATION_WINDOW_HOURS}={hours} is out of range"))?;
        }

        if let Some(raw) = lookup(ENV_ORDER_NUMBER_PREFIX) {
            let prefix = raw.trim();
            ensure!(!prefix.is_empty(), "{ENV_ORDER_NUMBER_PREFIX} must not be blank");
            config.order_number_prefix = prefix.to_string();
        }

        if let Some(raw) = lookup(ENV_ORDER_NUMBER_ATTEMPTS) {
            let attempts: u32 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_ORDER_NUMBER_ATTEMPTS}={raw:?} is not a number"))?;
            ensure!(attempts > 0, "{ENV_ORDER_NUMBER_ATTEMPTS} must be at least 1");
            config.max_order_number_attempts = attempts;
        }

        Ok(config)
    }
}

//! Value objects embedded in an order: line items, addresses, payment
//! details, pricing, shipping data and the actor who made a change.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::{ProductId, UserId};

use crate::error::{OrderError, OrderResult};

/// Catalog product kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Book,
    Ebook,
    Poster,
}

/// Line item as submitted by checkout. Carries no subtotal; that is always
/// derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Title snapshot at purchase time.
    pub title: String,
    /// Unit price in minor currency units.
    pub price: u64,
    pub quantity: u32,
}

/// Line item stored on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    pub price: u64,
    pub quantity: u32,
    /// `price * quantity`, recomputed before every save.
    pub subtotal: u64,
}

impl OrderItem {
    pub(crate) fn from_new(index: usize, item: &NewOrderItem) -> OrderResult<Self> {
        let title = item.title.trim();
        if title.is_empty() {
            return Err(OrderError::validation(format!("items[{index}].title is required")));
        }
        if item.quantity == 0 {
            return Err(OrderError::validation(format!(
                "items[{index}].quantity must be at least 1"
            )));
        }

        Ok(Self {
            product_id: item.product_id,
            item_type: item.item_type,
            title: title.to_string(),
            price: item.price,
            quantity: item.quantity,
            subtotal: line_subtotal(index, item.price, item.quantity)?,
        })
    }

    pub(crate) fn recompute_subtotal(&mut self, index: usize) -> OrderResult<()> {
        self.subtotal = line_subtotal(index, self.price, self.quantity)?;
        Ok(())
    }
}

fn line_subtotal(index: usize, price: u64, quantity: u32) -> OrderResult<u64> {
    price
        .checked_mul(u64::from(quantity))
        .ok_or_else(|| OrderError::validation(format!("items[{index}] subtotal overflows")))
}

/// Postal address. Shipping and billing share the shape; only the shipping
/// address must carry a phone number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    pub(crate) fn validate(&self, field: &str, require_phone: bool) -> OrderResult<()> {
        let required = [
            ("full_name", &self.full_name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (name, value) in required {
            require_text(field, name, value)?;
        }

        if require_phone {
            match &self.phone {
                Some(phone) if !phone.trim().is_empty() => {}
                _ => return Err(OrderError::validation(format!("{field}.phone is required"))),
            }
        }
        Ok(())
    }
}

/// Bank transfer channel the customer paid through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    #[default]
    Epay,
    Fbx,
}

/// Bank details shown to the customer at checkout. Immutable once placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub kind: PaymentKind,
    pub name: String,
    pub account_number: String,
    pub account_name: String,
    pub bank_name: String,
}

impl PaymentMethod {
    pub(crate) fn validate(&self) -> OrderResult<()> {
        require_text("payment_method", "name", &self.name)?;
        require_text("payment_method", "account_number", &self.account_number)?;
        require_text("payment_method", "account_name", &self.account_name)?;
        require_text("payment_method", "bank_name", &self.bank_name)
    }
}

fn require_text(parent: &str, name: &str, value: &str) -> OrderResult<()> {
    if value.trim().is_empty() {
        return Err(OrderError::validation(format!("{parent}.{name} is required")));
    }
    Ok(())
}

/// Flat price breakdown in minor currency units.
///
/// `total == subtotal + tax + shipping` is checked, never silently repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: u64,
    pub tax: u64,
    pub shipping: u64,
    pub total: u64,
}

impl Pricing {
    /// Build a breakdown whose total is the sum of its parts.
    pub fn from_parts(subtotal: u64, tax: u64, shipping: u64) -> OrderResult<Self> {
        let total = sum_parts(subtotal, tax, shipping)?;
        Ok(Self {
            subtotal,
            tax,
            shipping,
            total,
        })
    }

    pub fn validate(&self) -> OrderResult<()> {
        let expected = sum_parts(self.subtotal, self.tax, self.shipping)?;
        if self.total != expected {
            return Err(OrderError::validation(format!(
                "pricing.total {} does not equal subtotal + tax + shipping ({expected})",
                self.total
            )));
        }
        Ok(())
    }
}

fn sum_parts(subtotal: u64, tax: u64, shipping: u64) -> OrderResult<u64> {
    subtotal
        .checked_add(tax)
        .and_then(|v| v.checked_add(shipping))
        .ok_or_else(|| OrderError::validation("pricing total overflows"))
}

/// Fulfilment details accumulated while the order ships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub method: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
}

impl ShippingInfo {
    /// Overwrite only the fields the update actually provides.
    pub(crate) fn merge(&mut self, update: &ShippingUpdate) {
        if let Some(method) = non_blank(&update.method) {
            self.method = Some(method);
        }
        if let Some(carrier) = non_blank(&update.carrier) {
            self.carrier = Some(carrier);
        }
        if let Some(tracking) = non_blank(&update.tracking_number) {
            self.tracking_number = Some(tracking);
        }
        if update.estimated_delivery.is_some() {
            self.estimated_delivery = update.estimated_delivery;
        }
    }
}

/// Shipping fields an operator may supply when marking an order shipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingUpdate {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl ShippingUpdate {
    pub fn tracked(carrier: impl Into<String>, tracking_number: impl Into<String>) -> Self {
        Self {
            carrier: Some(carrier.into()),
            tracking_number: Some(tracking_number.into()),
            ..Self::default()
        }
    }

    /// Timeline note for the shipment.
    pub(crate) fn shipment_note(&self) -> String {
        match (non_blank(&self.carrier), non_blank(&self.tracking_number)) {
            (Some(carrier), Some(tracking)) => {
                format!("Order shipped via {carrier} (tracking {tracking})")
            }
            (None, Some(tracking)) => format!("Order shipped (tracking {tracking})"),
            _ => "Order shipped".to_string(),
        }
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Operational priority for the fulfilment queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Who performed a change recorded on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "user_id", rename_all = "snake_case")]
pub enum Actor {
    Customer(UserId),
    Admin(UserId),
    /// Scheduled jobs such as the verification deadline sweep.
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Customer(id) => write!(f, "customer:{id}"),
            Actor::Admin(id) => write!(f, "admin:{id}"),
            Actor::System => f.write_str("system"),
        }
    }
}

/// Free-text note slots on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteField {
    /// Reviewer notes about the payment proof.
    Verification,
    /// Internal staff notes.
    Admin,
    /// Notes the customer left at checkout.
    Customer,
}

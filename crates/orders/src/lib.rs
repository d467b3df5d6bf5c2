//! Order lifecycle domain (decide/evolve).
//!
//! An order is placed by checkout in `pending_verification`, resolved by a
//! human reviewing the uploaded bank-transfer proof, fulfilled through
//! processing/shipping/delivery and optionally refunded. Every status change
//! goes through the transition engine and lands in the append-only timeline.
//!
//! This crate is pure domain logic: no IO, no clocks, no storage. Timestamps
//! arrive on commands and persistence lives in `folio-infra`.

pub mod command;
pub mod error;
pub mod event;
pub mod expiry;
pub mod order;
pub mod refund;
pub mod shipping;
pub mod stats;
pub mod status;
pub mod timeline;
pub mod transition;
pub mod value_objects;
pub mod verification;

#[cfg(test)]
pub(crate) mod test_support;

pub use command::{
    ArchiveOrder, DeliverOrder, MarkProcessing, OrderCommand, PlaceOrder, ProcessRefund,
    RequestRefund, ResolveRefund, SetPriority, SetTags, ShipOrder, UpdateNotes, UpdateStatus,
    VerifyPayment,
};
pub use error::{OrderError, OrderResult};
pub use event::{
    DeliveryConfirmed, NotesUpdated, OrderArchived, OrderEvent, OrderPlaced, PaymentRejected,
    PaymentVerified, PriorityChanged, RefundProcessed, RefundRequested, RefundResolved,
    ShipmentRecorded, StatusChanged, TagsUpdated,
};
pub use order::{AGGREGATE_TYPE, Order};
pub use refund::{Refund, RefundDecision, RefundStatus};
pub use stats::OrderStats;
pub use status::{OrderStatus, PaymentStatus};
pub use timeline::{Timeline, TimelineEntry, TimelineStatus};
pub use value_objects::{
    Actor, Address, ItemType, NewOrderItem, NoteField, OrderItem, PaymentKind, PaymentMethod,
    Pricing, Priority, ShippingInfo, ShippingUpdate,
};

//! Order command execution (application-level orchestration).
//!
//! Every mutation runs the same pipeline:
//!
//! ```text
//! load order (NotFound if missing)
//!   -> handle command (pure, may decide zero events)
//!   -> apply events + validate_and_normalize
//!   -> save with compare-and-set on the loaded version
//!   -> publish committed events on the bus
//! ```
//!
//! Publication happens only after the save succeeded. A writer that loses
//! the compare-and-set gets `ConcurrentModification` and nothing is
//! published for it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{Span, debug, field, info, instrument, warn};

use folio_core::{Aggregate, AggregateRoot, ExpectedVersion, OrderId, UserId};
use folio_events::{EventBus, EventEnvelope};
use folio_orders::{
    AGGREGATE_TYPE, Actor, Address, ArchiveOrder, DeliverOrder, MarkProcessing, NewOrderItem,
    NoteField, Order, OrderCommand, OrderError, OrderEvent, OrderStats, OrderStatus,
    PaymentMethod, PlaceOrder, Pricing, Priority, ProcessRefund, RefundDecision, RequestRefund,
    ResolveRefund, SetPriority, SetTags, ShipOrder, ShippingUpdate, UpdateNotes, UpdateStatus,
    VerifyPayment, expiry,
};

use crate::clock::Clock;
use crate::config::OrdersConfig;
use crate::order_number::OrderNumberGenerator;
use crate::repository::{OrderPage, OrderQuery, OrderRepository, Pagination, RepositoryError};

/// Checkout payload for [`OrderService::create_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    pub transaction_proof: String,
    pub pricing: Pricing,
    pub notes: Option<String>,
}

#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error("order {0} not found")]
    NotFound(String),

    /// Lost the compare-and-set race; retry with fresh state.
    #[error("order {order_id} was modified concurrently: {message}")]
    ConcurrentModification { order_id: OrderId, message: String },

    #[error(transparent)]
    Domain(#[from] OrderError),

    #[error("no unique order number after {attempts} attempts")]
    OrderNumberExhausted { attempts: u32 },

    #[error("repository failure: {0}")]
    Store(RepositoryError),

    /// The write is durable but some subscribers may have missed it.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl OrderServiceError {
    /// Worth one more attempt with freshly loaded state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderServiceError::ConcurrentModification { .. }
                | OrderServiceError::OrderNumberExhausted { .. }
        )
    }

    /// A double-submit: nothing changed because the order was already past
    /// the requested gate.
    pub fn is_benign(&self) -> bool {
        matches!(self, OrderServiceError::Domain(err) if err.is_benign())
    }

    fn from_store(order_id: OrderId, err: RepositoryError) -> Self {
        match err {
            RepositoryError::Concurrency(message) => {
                OrderServiceError::ConcurrentModification { order_id, message }
            }
            RepositoryError::NotFound(id) => OrderServiceError::NotFound(id.to_string()),
            other => OrderServiceError::Store(other),
        }
    }
}

/// Boundary operations over orders.
///
/// - `R`: document store
/// - `B`: bus receiving committed events
/// - `G`: order number source
/// - `C`: time source for every `occurred_at`
#[derive(Debug)]
pub struct OrderService<R, B, G, C> {
    repository: R,
    bus: B,
    numbers: G,
    clock: C,
    config: OrdersConfig,
}

impl<R, B, G, C> OrderService<R, B, G, C> {
    pub fn new(repository: R, bus: B, numbers: G, clock: C, config: OrdersConfig) -> Self {
        Self {
            repository,
            bus,
            numbers,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &OrdersConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

impl<R, B, G, C> OrderService<R, B, G, C>
where
    R: OrderRepository,
    B: EventBus<EventEnvelope<OrderEvent>>,
    G: OrderNumberGenerator,
    C: Clock,
{
    /// Place a new order in `pending_verification`.
    ///
    /// Retries with a fresh number when the generated one is taken.
    #[instrument(
        skip(self, new_order),
        fields(user_id = %new_order.user_id, order_id = field::Empty, order_number = field::Empty),
        err
    )]
    pub fn create_order(&self, new_order: NewOrder) -> Result<Order, OrderServiceError> {
        let attempts = self.config.max_order_number_attempts.max(1);
        let order_id = OrderId::new();
        Span::current().record("order_id", field::display(order_id));

        for attempt in 1..=attempts {
            let now = self.clock.now();
            let command = PlaceOrder {
                order_id,
                order_number: self
                    .numbers
                    .generate(&self.config.order_number_prefix, now),
                user_id: new_order.user_id,
                items: new_order.items.clone(),
                shipping_address: new_order.shipping_address.clone(),
                billing_address: new_order.billing_address.clone(),
                payment_method: new_order.payment_method.clone(),
                transaction_proof: new_order.transaction_proof.clone(),
                pricing: new_order.pricing,
                notes: new_order.notes.clone(),
                verification_deadline: Some(now + self.config.verification_window),
                occurred_at: now,
            };

            let mut order = Order::empty(order_id);
            let events = order.handle(&OrderCommand::PlaceOrder(command))?;
            for event in &events {
                order.apply(event);
            }
            order.validate_and_normalize()?;

            match self.repository.insert(&order) {
                Ok(()) => {
                    Span::current().record("order_number", order.order_number());
                    self.publish(&order, 0, events)?;
                    info!(
                        order_number = %order.order_number(),
                        total = order.pricing().total,
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(RepositoryError::DuplicateOrderNumber(number)) => {
                    warn!(attempt, attempts, order_number = %number, "order number collision");
                }
                Err(err) => return Err(OrderServiceError::from_store(order_id, err)),
            }
        }

        Err(OrderServiceError::OrderNumberExhausted { attempts })
    }

    /// Run one command against a stored order.
    ///
    /// `expected` lets a caller pin the version it last saw; the write itself
    /// always compares against the version loaded here. `build` receives the
    /// loaded order and the command timestamp.
    #[instrument(
        skip(self, build),
        fields(order_id = %order_id, command = field::Empty, version = field::Empty)
    )]
    pub fn execute<F>(
        &self,
        order_id: OrderId,
        expected: ExpectedVersion,
        build: F,
    ) -> Result<Order, OrderServiceError>
    where
        F: FnOnce(&Order, DateTime<Utc>) -> OrderCommand,
    {
        let mut order = self.load(order_id)?;
        let loaded_version = order.version();

        expected.check(loaded_version).map_err(|err| {
            warn!(loaded_version, "stale expected version");
            OrderServiceError::ConcurrentModification {
                order_id,
                message: err.to_string(),
            }
        })?;

        let command = build(&order, self.clock.now());
        let span = Span::current();
        span.record("command", command.name());

        let events = match order.handle(&command) {
            Ok(events) => events,
            Err(err) if err.is_benign() => {
                debug!(error = %err, "command already applied");
                return Err(err.into());
            }
            Err(err) => {
                warn!(error = %err, status = %order.status(), "command rejected");
                return Err(err.into());
            }
        };

        if events.is_empty() {
            debug!(status = %order.status(), "command changed nothing");
            return Ok(order);
        }

        for event in &events {
            order.apply(event);
        }
        order.validate_and_normalize()?;

        if let Err(err) = self
            .repository
            .save(&order, ExpectedVersion::Exact(loaded_version))
        {
            let err = OrderServiceError::from_store(order_id, err);
            warn!(error = %err, loaded_version, "order save failed");
            return Err(err);
        }

        span.record("version", order.version());
        self.publish(&order, loaded_version, events)?;

        info!(
            order_number = %order.order_number(),
            status = %order.status(),
            payment_status = %order.payment_status(),
            version = order.version(),
            "order updated"
        );
        Ok(order)
    }

    pub fn verify_payment(
        &self,
        order_id: OrderId,
        approved: bool,
        notes: impl Into<String>,
        actor: Actor,
    ) -> Result<Order, OrderServiceError> {
        let notes = notes.into();
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::VerifyPayment(VerifyPayment {
                order_id,
                approved,
                notes,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn update_status(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        shipping: Option<ShippingUpdate>,
        note: Option<String>,
        actor: Actor,
    ) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::UpdateStatus(UpdateStatus {
                order_id,
                target,
                shipping,
                note,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn mark_processing(&self, order_id: OrderId, actor: Actor) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::MarkProcessing(MarkProcessing {
                order_id,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn ship(
        &self,
        order_id: OrderId,
        shipping: ShippingUpdate,
        actor: Actor,
    ) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::ShipOrder(ShipOrder {
                order_id,
                shipping,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn deliver(&self, order_id: OrderId, actor: Actor) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::DeliverOrder(DeliverOrder {
                order_id,
                actor,
                occurred_at: now,
            })
        })
    }

    /// Customer-initiated refund request; the requester is the order's owner.
    pub fn request_refund(
        &self,
        order_id: OrderId,
        reason: impl Into<String>,
    ) -> Result<Order, OrderServiceError> {
        let reason = reason.into();
        self.execute(order_id, ExpectedVersion::Any, |order, now| {
            OrderCommand::RequestRefund(RequestRefund {
                order_id,
                reason,
                requested_by: Actor::Customer(order.user_id()),
                occurred_at: now,
            })
        })
    }

    pub fn resolve_refund(
        &self,
        order_id: OrderId,
        decision: RefundDecision,
        actor: Actor,
    ) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::ResolveRefund(ResolveRefund {
                order_id,
                decision,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn process_refund(
        &self,
        order_id: OrderId,
        amount: u64,
        actor: Actor,
    ) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::ProcessRefund(ProcessRefund {
                order_id,
                amount,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn update_notes(
        &self,
        order_id: OrderId,
        field: NoteField,
        text: Option<String>,
        actor: Actor,
    ) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::UpdateNotes(UpdateNotes {
                order_id,
                field,
                text,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn set_priority(&self, order_id: OrderId, priority: Priority) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::SetPriority(SetPriority {
                order_id,
                priority,
                occurred_at: now,
            })
        })
    }

    pub fn set_tags(&self, order_id: OrderId, tags: Vec<String>) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::SetTags(SetTags {
                order_id,
                tags,
                occurred_at: now,
            })
        })
    }

    pub fn archive(&self, order_id: OrderId, actor: Actor) -> Result<Order, OrderServiceError> {
        self.execute(order_id, ExpectedVersion::Any, |_, now| {
            OrderCommand::ArchiveOrder(ArchiveOrder {
                order_id,
                actor,
                occurred_at: now,
            })
        })
    }

    pub fn get(&self, order_id: OrderId) -> Result<Order, OrderServiceError> {
        self.load(order_id)
    }

    pub fn get_by_number(&self, order_number: &str) -> Result<Order, OrderServiceError> {
        self.repository
            .find_by_number(order_number)
            .map_err(OrderServiceError::Store)?
            .ok_or_else(|| OrderServiceError::NotFound(order_number.to_string()))
    }

    pub fn list(&self, query: &OrderQuery) -> Result<OrderPage, OrderServiceError> {
        self.repository.query(query).map_err(OrderServiceError::Store)
    }

    /// Counts and revenue over stored documents, optionally one customer's.
    #[instrument(skip(self), err)]
    pub fn get_order_stats(&self, user_id: Option<UserId>) -> Result<OrderStats, OrderServiceError> {
        let documents = self
            .repository
            .documents(user_id)
            .map_err(OrderServiceError::Store)?;
        let stats = OrderStats::from_documents(&documents, user_id);
        debug!(total_orders = stats.total_orders, "order stats computed");
        Ok(stats)
    }

    pub fn is_expired(&self, order_id: OrderId) -> Result<bool, OrderServiceError> {
        let order = self.load(order_id)?;
        Ok(expiry::is_expired(&order, self.clock.now()))
    }

    pub fn days_until_deadline(&self, order_id: OrderId) -> Result<Option<i64>, OrderServiceError> {
        let order = self.load(order_id)?;
        Ok(expiry::days_until_deadline(&order, self.clock.now()))
    }

    /// Oldest unreviewed orders past their deadline, for the external sweep.
    #[instrument(skip(self), err)]
    pub fn expired_pending(&self, limit: u32) -> Result<Vec<Order>, OrderServiceError> {
        let now = self.clock.now();
        let query =
            OrderQuery::expired_pending(now).with_pagination(Pagination::new(Some(limit), None));
        let page = self.list(&query)?;
        debug!(found = page.orders.len(), total = page.total, "expired orders listed");
        Ok(page.orders)
    }

    fn load(&self, order_id: OrderId) -> Result<Order, OrderServiceError> {
        self.repository
            .load(order_id)
            .map_err(|err| OrderServiceError::from_store(order_id, err))?
            .ok_or_else(|| OrderServiceError::NotFound(order_id.to_string()))
    }

    /// Publish committed events; `base_version` is the version before them.
    fn publish(
        &self,
        order: &Order,
        base_version: u64,
        events: Vec<OrderEvent>,
    ) -> Result<(), OrderServiceError> {
        let aggregate_id = *order.id_typed().as_uuid();
        for (offset, event) in events.into_iter().enumerate() {
            let sequence_number = base_version + offset as u64 + 1;
            let envelope = EventEnvelope::new(aggregate_id, AGGREGATE_TYPE, sequence_number, event);
            self.bus
                .publish(envelope)
                .map_err(|err| OrderServiceError::Publish(format!("{err:?}")))?;
        }
        Ok(())
    }
}

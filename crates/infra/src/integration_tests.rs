//! Integration tests for the full order pipeline.
//!
//! Tests: OrderService -> OrderRepository -> EventBus
//!
//! Verifies:
//! - workflows persist their state and publish only committed events
//! - rejected commands leave storage and the bus untouched
//! - concurrent writers on one order cannot both win

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;
    use serde_json::Value as JsonValue;

    use folio_core::{AggregateRoot, ExpectedVersion, OrderId, UserId};
    use folio_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
    use folio_orders::{
        Actor, Order, OrderCommand, OrderError, OrderEvent, OrderStatus, PaymentStatus,
        Pricing, RefundDecision, RefundStatus, ShippingUpdate, TimelineStatus, UpdateStatus,
    };

    use crate::clock::FixedClock;
    use crate::config::{ENV_ORDER_NUMBER_PREFIX, OrdersConfig};
    use crate::order_number::{DefaultOrderNumberGenerator, OrderNumberGenerator};
    use crate::order_service::{OrderService, OrderServiceError};
    use crate::repository::{
        InMemoryOrderRepository, OrderPage, OrderQuery, OrderRepository, RepositoryError,
    };
    use crate::test_support::{admin, new_order, t0};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<OrderEvent>>>;
    type Service<R, G> = OrderService<R, Bus, G, Arc<FixedClock>>;

    struct Harness<R, G> {
        service: Service<R, G>,
        bus: Bus,
        clock: Arc<FixedClock>,
    }

    fn harness_with<R, G>(repository: R, numbers: G, config: OrdersConfig) -> Harness<R, G> {
        folio_observability::init();
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let service = OrderService::new(repository, bus.clone(), numbers, clock.clone(), config);
        Harness {
            service,
            bus,
            clock,
        }
    }

    fn harness() -> Harness<Arc<InMemoryOrderRepository>, DefaultOrderNumberGenerator> {
        harness_with(
            Arc::new(InMemoryOrderRepository::new()),
            DefaultOrderNumberGenerator,
            OrdersConfig::default(),
        )
    }

    fn event_types(sub: &Subscription<EventEnvelope<OrderEvent>>) -> Vec<String> {
        sub.drain()
            .iter()
            .map(|env| env.event_type().to_string())
            .collect()
    }

    /// Hands out the given numbers in order.
    struct ScriptedNumbers(Mutex<VecDeque<String>>);

    impl ScriptedNumbers {
        fn new(numbers: &[&str]) -> Self {
            Self(Mutex::new(numbers.iter().map(|n| n.to_string()).collect()))
        }
    }

    impl OrderNumberGenerator for ScriptedNumbers {
        fn generate(&self, _prefix: &str, _now: DateTime<Utc>) -> String {
            self.0.lock().unwrap().pop_front().unwrap()
        }
    }

    /// Holds every save at a barrier so two writers reach the
    /// compare-and-set with the same loaded version.
    struct BarrierRepository {
        inner: Arc<InMemoryOrderRepository>,
        barrier: Barrier,
    }

    impl OrderRepository for BarrierRepository {
        fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
            self.inner.insert(order)
        }

        fn load(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
            self.inner.load(id)
        }

        fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
            self.inner.find_by_number(order_number)
        }

        fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), RepositoryError> {
            self.barrier.wait();
            self.inner.save(order, expected)
        }

        fn query(&self, query: &OrderQuery) -> Result<OrderPage, RepositoryError> {
            self.inner.query(query)
        }

        fn documents(&self, user_id: Option<UserId>) -> Result<Vec<JsonValue>, RepositoryError> {
            self.inner.documents(user_id)
        }
    }

    #[test]
    fn create_order_stores_pending_order_and_publishes_placement() {
        let h = harness();
        let sub = h.bus.subscribe();

        let order = h.service.create_order(new_order(UserId::new())).unwrap();

        assert_eq!(order.status(), OrderStatus::PendingVerification);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.verification_deadline(), Some(t0() + Duration::hours(48)));
        assert!(order.order_number().starts_with("ORD-20240501-"));
        assert_eq!(order.items()[0].subtotal, 100);

        let stored = h.service.get(order.id_typed()).unwrap();
        assert_eq!(stored, order);
        assert_eq!(h.service.get_by_number(order.order_number()).unwrap(), order);

        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "orders.order.placed");
        assert_eq!(published[0].sequence_number(), 1);
        assert_eq!(published[0].aggregate_type(), "orders.order");
        assert_eq!(published[0].aggregate_id(), *order.id_typed().as_uuid());
    }

    #[test]
    fn configured_prefix_is_used_for_order_numbers() {
        let config = OrdersConfig::from_lookup(|key| {
            (key == ENV_ORDER_NUMBER_PREFIX).then(|| "BK".to_string())
        })
        .unwrap();
        let h = harness_with(
            Arc::new(InMemoryOrderRepository::new()),
            DefaultOrderNumberGenerator,
            config,
        );

        let order = h.service.create_order(new_order(UserId::new())).unwrap();

        assert!(
            order.order_number().starts_with("BK-20240501-"),
            "unexpected number {}",
            order.order_number()
        );
        assert_eq!(h.service.get_by_number(order.order_number()).unwrap(), order);
    }

    #[test]
    fn mismatched_total_is_rejected_and_nothing_is_stored() {
        let h = harness();
        let sub = h.bus.subscribe();

        let mut input = new_order(UserId::new());
        input.pricing = Pricing {
            subtotal: 100,
            tax: 8,
            shipping: 12,
            total: 119,
        };

        match h.service.create_order(input) {
            Err(OrderServiceError::Domain(OrderError::Validation(msg))) => {
                assert!(msg.contains("pricing.total"))
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
        assert!(h.service.repository().documents(None).unwrap().is_empty());
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn rejected_payment_cancels_the_order() {
        let h = harness();
        let order = h.service.create_order(new_order(UserId::new())).unwrap();

        h.clock.advance(Duration::hours(1));
        let order = h
            .service
            .verify_payment(order.id_typed(), false, "blurry proof", admin())
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment_status(), PaymentStatus::Rejected);
        assert_eq!(order.timeline().len(), 2);
        assert_eq!(
            order.timeline().last().unwrap().note,
            "Payment rejected: blurry proof"
        );
        assert_eq!(h.service.get(order.id_typed()).unwrap(), order);
    }

    #[test]
    fn verified_order_ships_with_tracking() {
        let h = harness();
        let sub = h.bus.subscribe();
        let id = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();

        h.service.verify_payment(id, true, "matches statement", admin()).unwrap();
        h.clock.advance(Duration::minutes(5));
        h.service.mark_processing(id, admin()).unwrap();
        h.clock.advance(Duration::minutes(5));
        let order = h
            .service
            .ship(id, ShippingUpdate::tracked("DHL", "TRK1"), admin())
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.shipping_info().shipped_at, Some(t0() + Duration::minutes(10)));
        assert!(order.timeline().last().unwrap().note.contains("TRK1"));

        assert_eq!(
            event_types(&sub),
            vec![
                "orders.order.placed",
                "orders.order.payment_verified",
                "orders.order.status_changed",
                "orders.order.status_changed",
                "orders.order.shipment_recorded",
                "orders.order.status_changed",
            ]
        );
    }

    #[test]
    fn deliver_before_ship_is_an_invalid_transition() {
        let h = harness();
        let id = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();
        h.service.verify_payment(id, true, "", admin()).unwrap();
        h.service.mark_processing(id, admin()).unwrap();

        match h.service.deliver(id, admin()) {
            Err(OrderServiceError::Domain(OrderError::InvalidTransition { from, to })) => {
                assert_eq!(from, OrderStatus::Processing);
                assert_eq!(to, OrderStatus::Delivered);
            }
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(h.service.get(id).unwrap().status(), OrderStatus::Processing);
    }

    #[test]
    fn concurrent_status_updates_cannot_both_win() {
        let inner = Arc::new(InMemoryOrderRepository::new());

        // Bring an order to `verified` without the barrier in the way.
        let setup = harness_with(
            inner.clone(),
            DefaultOrderNumberGenerator,
            OrdersConfig::default(),
        );
        let id = setup.service.create_order(new_order(UserId::new())).unwrap().id_typed();
        setup.service.verify_payment(id, true, "", admin()).unwrap();
        let before = inner.load(id).unwrap().unwrap();

        let racing = harness_with(
            BarrierRepository {
                inner: inner.clone(),
                barrier: Barrier::new(2),
            },
            DefaultOrderNumberGenerator,
            OrdersConfig::default(),
        );
        racing.clock.set(t0() + Duration::minutes(1));
        let sub = racing.bus.subscribe();
        let service = &racing.service;

        let (to_processing, to_cancelled) = thread::scope(|s| {
            let a = s.spawn(|| {
                service.update_status(id, OrderStatus::Processing, None, None, admin())
            });
            let b = s.spawn(|| {
                service.update_status(id, OrderStatus::Cancelled, None, None, admin())
            });
            (a.join().unwrap(), b.join().unwrap())
        });

        let (winner, loser) = match (to_processing, to_cancelled) {
            (Ok(order), Err(err)) | (Err(err), Ok(order)) => (order, err),
            other => panic!("Expected exactly one winner, got {other:?}"),
        };

        assert!(matches!(
            loser,
            OrderServiceError::ConcurrentModification { order_id, .. } if order_id == id
        ));
        assert!(loser.is_retryable());

        let stored = inner.load(id).unwrap().unwrap();
        assert_eq!(stored, winner);
        assert_eq!(stored.version(), before.version() + 1);
        assert_eq!(stored.timeline().len(), before.timeline().len() + 1);

        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].sequence_number(), stored.version());
    }

    #[test]
    fn verifying_twice_is_benign_and_adds_one_entry() {
        let h = harness();
        let id = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();

        let first = h.service.verify_payment(id, true, "ok", admin()).unwrap();
        let err = h.service.verify_payment(id, true, "ok", admin()).unwrap_err();

        assert!(err.is_benign());
        assert!(!err.is_retryable());
        let stored = h.service.get(id).unwrap();
        assert_eq!(stored, first);
        let verified_entries = stored
            .timeline()
            .iter()
            .filter(|e| e.status == TimelineStatus::Order(OrderStatus::Verified))
            .count();
        assert_eq!(verified_entries, 1);
    }

    #[test]
    fn refund_flow_through_the_service() {
        let h = harness();
        let customer = UserId::new();
        let id = h.service.create_order(new_order(customer)).unwrap().id_typed();
        h.service.verify_payment(id, true, "", admin()).unwrap();
        h.service.mark_processing(id, admin()).unwrap();
        h.service.ship(id, ShippingUpdate::default(), admin()).unwrap();
        h.service.deliver(id, admin()).unwrap();

        h.service.request_refund(id, "Pages missing").unwrap();
        let replay = h.service.request_refund(id, "Pages missing").unwrap_err();
        assert!(replay.is_benign());
        match h.service.process_refund(id, 120, admin()) {
            Err(OrderServiceError::Domain(OrderError::RefundNotApproved { status })) => {
                assert_eq!(status, Some(RefundStatus::Pending))
            }
            other => panic!("Expected RefundNotApproved, got {other:?}"),
        }

        h.service.resolve_refund(id, RefundDecision::Approved, admin()).unwrap();
        let replay = h.service.resolve_refund(id, RefundDecision::Approved, admin()).unwrap_err();
        assert!(replay.is_benign());
        match h.service.resolve_refund(id, RefundDecision::Rejected, admin()) {
            Err(OrderServiceError::Domain(OrderError::RefundDecisionConflict { status, .. })) => {
                assert_eq!(status, RefundStatus::Approved)
            }
            other => panic!("Expected RefundDecisionConflict, got {other:?}"),
        }
        let order = h.service.process_refund(id, 120, admin()).unwrap();

        assert_eq!(order.status(), OrderStatus::Refunded);
        assert_eq!(order.payment_status(), PaymentStatus::Refunded);
        let refund = order.refund().unwrap();
        assert_eq!(refund.requested_by, Actor::Customer(customer));
        assert_eq!(refund.amount, Some(120));
        assert_eq!(refund.processed_by, Some(admin()));

        let err = h.service.process_refund(id, 120, admin()).unwrap_err();
        assert!(err.is_benign());
    }

    #[test]
    fn unknown_order_is_not_found() {
        let h = harness();
        let missing = OrderId::new();

        assert!(matches!(
            h.service.verify_payment(missing, true, "", admin()),
            Err(OrderServiceError::NotFound(_))
        ));
        assert!(matches!(h.service.get(missing), Err(OrderServiceError::NotFound(_))));
        assert!(matches!(h.service.is_expired(missing), Err(OrderServiceError::NotFound(_))));
        assert!(matches!(
            h.service.get_by_number("ORD-nope"),
            Err(OrderServiceError::NotFound(_))
        ));
    }

    #[test]
    fn number_collisions_are_retried() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let h = harness_with(
            repository,
            ScriptedNumbers::new(&["ORD-X", "ORD-X", "ORD-Y"]),
            OrdersConfig::default(),
        );

        let first = h.service.create_order(new_order(UserId::new())).unwrap();
        let second = h.service.create_order(new_order(UserId::new())).unwrap();
        assert_eq!(first.order_number(), "ORD-X");
        assert_eq!(second.order_number(), "ORD-Y");
    }

    #[test]
    fn exhausted_numbers_are_reported_as_retryable() {
        let h = harness_with(
            Arc::new(InMemoryOrderRepository::new()),
            ScriptedNumbers::new(&["ORD-X", "ORD-X", "ORD-X"]),
            OrdersConfig::default().with_max_order_number_attempts(2),
        );

        h.service.create_order(new_order(UserId::new())).unwrap();
        let err = h.service.create_order(new_order(UserId::new())).unwrap_err();
        assert!(matches!(err, OrderServiceError::OrderNumberExhausted { attempts: 2 }));
        assert!(err.is_retryable());
    }

    #[test]
    fn stats_cover_all_orders_or_one_customer() {
        let h = harness();
        let alice = UserId::new();
        let a1 = h.service.create_order(new_order(alice)).unwrap().id_typed();
        h.service.create_order(new_order(alice)).unwrap();
        h.service.create_order(new_order(UserId::new())).unwrap();
        h.service.verify_payment(a1, false, "no transfer", admin()).unwrap();

        let all = h.service.get_order_stats(None).unwrap();
        assert_eq!(all.total_orders, 3);
        assert_eq!(all.total_revenue, 360);
        assert_eq!(all.pending_orders, 2);
        assert_eq!(all.cancelled_orders, 1);

        let mine = h.service.get_order_stats(Some(alice)).unwrap();
        assert_eq!(mine.total_orders, 2);
        assert_eq!(mine.pending_orders, 1);
        assert_eq!(mine.cancelled_orders, 1);
    }

    #[test]
    fn deadline_evaluation_follows_the_clock() {
        let h = harness();
        let stale = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();
        let reviewed = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();
        h.service.verify_payment(reviewed, true, "", admin()).unwrap();

        assert!(!h.service.is_expired(stale).unwrap());
        assert_eq!(h.service.days_until_deadline(stale).unwrap(), Some(2));

        h.clock.advance(Duration::hours(48) + Duration::seconds(1));
        assert!(h.service.is_expired(stale).unwrap());
        assert_eq!(h.service.days_until_deadline(stale).unwrap(), Some(0));

        let expired = h.service.expired_pending(10).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id_typed(), stale);
        // Evaluation never cancels anything by itself.
        assert_eq!(expired[0].status(), OrderStatus::PendingVerification);
    }

    #[test]
    fn stale_expected_version_is_a_concurrent_modification() {
        let h = harness();
        let id = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();
        h.service.verify_payment(id, true, "", admin()).unwrap();

        let result = h.service.execute(id, ExpectedVersion::Exact(1), |_, now| {
            OrderCommand::UpdateStatus(UpdateStatus {
                order_id: id,
                target: OrderStatus::Cancelled,
                shipping: None,
                note: None,
                actor: admin(),
                occurred_at: now,
            })
        });

        assert!(matches!(
            result,
            Err(OrderServiceError::ConcurrentModification { .. })
        ));
        assert_eq!(h.service.get(id).unwrap().status(), OrderStatus::Verified);
    }

    #[test]
    fn same_status_update_is_a_quiet_no_op() {
        let h = harness();
        let id = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();
        h.service.verify_payment(id, true, "", admin()).unwrap();
        let sub = h.bus.subscribe();

        let order = h
            .service
            .update_status(id, OrderStatus::Verified, None, None, admin())
            .unwrap();

        assert_eq!(order.version(), 3);
        assert_eq!(order.timeline().len(), 2);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn archived_orders_drop_out_of_default_listings() {
        let h = harness();
        let customer = UserId::new();
        let id = h.service.create_order(new_order(customer)).unwrap().id_typed();
        h.service.create_order(new_order(customer)).unwrap();
        h.service.verify_payment(id, false, "", admin()).unwrap();
        h.service.archive(id, admin()).unwrap();

        let page = h.service.list(&OrderQuery::for_user(customer)).unwrap();
        assert_eq!(page.total, 1);
        assert!(page.orders.iter().all(|o| o.id_typed() != id));

        let page = h
            .service
            .list(&OrderQuery::for_user(customer).including_archived())
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Verify(bool),
        Update(usize),
        Refund,
        Resolve(bool),
        Process(u64),
        Tags,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            any::<bool>().prop_map(Step::Verify),
            (0usize..OrderStatus::ALL.len()).prop_map(Step::Update),
            Just(Step::Refund),
            any::<bool>().prop_map(Step::Resolve),
            (0u64..200).prop_map(Step::Process),
            Just(Step::Tags),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Whatever the admin does, every stored document keeps its pricing
        /// and subtotal invariants and every version was published once.
        #[test]
        fn stored_orders_keep_invariants_under_random_operations(
            steps in prop::collection::vec(step(), 1..25)
        ) {
            let h = harness();
            let sub = h.bus.subscribe();
            let id = h.service.create_order(new_order(UserId::new())).unwrap().id_typed();

            for step in steps {
                h.clock.advance(Duration::minutes(1));
                let _ = match step {
                    Step::Verify(approved) => h.service.verify_payment(id, approved, "", admin()),
                    Step::Update(i) => {
                        h.service.update_status(id, OrderStatus::ALL[i], None, None, admin())
                    }
                    Step::Refund => h.service.request_refund(id, "changed my mind"),
                    Step::Resolve(approved) => {
                        let decision = if approved {
                            RefundDecision::Approved
                        } else {
                            RefundDecision::Rejected
                        };
                        h.service.resolve_refund(id, decision, admin())
                    }
                    Step::Process(amount) => h.service.process_refund(id, amount, admin()),
                    Step::Tags => h.service.set_tags(id, vec!["vip".to_string()]),
                };
            }

            let stored = h.service.get(id).unwrap();
            let pricing = stored.pricing();
            prop_assert_eq!(pricing.total, pricing.subtotal + pricing.tax + pricing.shipping);
            for item in stored.items() {
                prop_assert_eq!(item.subtotal, item.price * u64::from(item.quantity));
            }
            if let Some(amount) = stored.refund().and_then(|r| r.amount) {
                prop_assert!(amount <= pricing.total);
            }

            let sequence: Vec<u64> = sub.drain().iter().map(|e| e.sequence_number()).collect();
            let expected: Vec<u64> = (1..=stored.version()).collect();
            prop_assert_eq!(sequence, expected);
        }
    }
}

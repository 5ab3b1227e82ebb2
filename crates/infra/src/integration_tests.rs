//! Integration tests for the full fulfillment pipeline.
//!
//! Tests: submit → IntakeQueue → OrderAggregateBuilder → CommitObservable → NotificationFanout
//!
//! Every scenario runs against both intake shapes.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, mpsc};
    use std::thread;
    use std::time::Duration;

    use orderflow_core::{
        CustomerId, FulfillmentError, InMemoryRecordStore, OrderId, ProductId, RecordStore,
        SalesmanId, StoreError, Violation, WarehouseId,
    };
    use orderflow_events::{CommitObserver, ObserverError};
    use orderflow_inventory::{InventoryRecord, StockKey};
    use orderflow_products::Product;
    use orderflow_sales::{
        CompensationPolicy, ItemKey, OrderHeader, OrderItem, OrderRequest, OrderRules, OrderStores,
    };

    use crate::config::PipelineConfig;
    use crate::documents::{JsonRenderer, ShipmentDocument, ShipmentManifest};
    use crate::intake::{IntakeError, IntakeShape, OrderLifecycle};
    use crate::pipeline::FulfillmentPipeline;
    use crate::stores::InMemoryStores;

    const SHAPES: [IntakeShape; 2] = [IntakeShape::Channel, IntakeShape::Ring];

    fn catalog() -> Vec<Product> {
        vec![
            Product::new(ProductId::new(1), "Bolt", 10, 25),
            Product::new(ProductId::new(2), "Nut", 5, 12),
            Product::new(ProductId::new(3), "Widget", 120, 200),
            Product::new(ProductId::new(4), "Gadget", 275, 400),
            Product::new(ProductId::new(5), "Crate", 900, 1500),
            Product::new(ProductId::new(6), "Sprocket", 60, 90),
        ]
    }

    fn stock() -> Vec<InventoryRecord> {
        [
            (1, 1, 50),
            (1, 2, 50),
            (2, 1, 30),
            (3, 1, 5),
            (3, 2, 10),
            (4, 2, 3),
            (4, 3, 8),
            (5, 1, 10),
            (5, 2, 999),
            (5, 3, 0),
            (6, 1, 100),
        ]
        .into_iter()
        .map(|(p, w, q)| InventoryRecord::new(ProductId::new(p), WarehouseId::new(w), q))
        .collect()
    }

    fn stores() -> InMemoryStores {
        InMemoryStores::seeded(catalog(), stock()).unwrap()
    }

    fn config(shape: IntakeShape) -> PipelineConfig {
        PipelineConfig::default()
            .with_name(format!("it-{shape}"))
            .with_intake_shape(shape)
            .with_intake_capacity(8)
            .with_fanout_workers(2)
    }

    fn start(shape: IntakeShape, stores: &InMemoryStores) -> FulfillmentPipeline {
        start_with(config(shape), stores, OrderRules::standard())
    }

    fn start_with(config: PipelineConfig, stores: &InMemoryStores, rules: OrderRules) -> FulfillmentPipeline {
        FulfillmentPipeline::start_with_rules(
            config,
            stores.order_stores(),
            stores.documents(),
            Arc::new(JsonRenderer),
            rules,
        )
        .unwrap()
    }

    fn request(lines: &[(u64, u32)]) -> OrderRequest {
        lines.iter().fold(
            OrderRequest::new(CustomerId::new(7), SalesmanId::new(3)),
            |req, &(p, q)| req.with_item(ProductId::new(p), q),
        )
    }

    fn quantity(stores: &InMemoryStores, p: u64, w: u64) -> u32 {
        stores
            .inventory
            .find(&StockKey::new(ProductId::new(p), WarehouseId::new(w)))
            .unwrap()
            .unwrap()
            .quantity
    }

    fn on_hand(stores: &InMemoryStores, p: u64) -> u64 {
        stores
            .inventory
            .snapshot()
            .iter()
            .filter(|r| r.product_id == ProductId::new(p))
            .map(|r| u64::from(r.quantity))
            .sum()
    }

    fn recording_observer(seen: Arc<Mutex<Vec<OrderId>>>) -> Arc<dyn CommitObserver<OrderHeader>> {
        Arc::new(move |h: &OrderHeader| -> Result<(), ObserverError> {
            seen.lock().unwrap().push(h.order_id.unwrap());
            Ok(())
        })
    }

    #[test]
    fn two_line_order_round_trip() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);

            let pending = pipeline.submit(request(&[(3, 1), (4, 1)])).unwrap();
            let seq = pending.sequence();
            let header = pending.wait().unwrap();
            pipeline.shutdown();

            let order_id = header.order_id.expect("generated key");
            assert!(order_id.is_assigned());

            let items = pipeline.builder().items_of(order_id).unwrap();
            assert_eq!(items.len(), 2);
            assert_eq!((items[0].item_id, items[0].unit_price), (1, 120));
            assert_eq!((items[1].item_id, items[1].unit_price), (2, 275));
            assert!(items.iter().all(|i| i.order_id == order_id));

            // First fit: warehouse 1 for product 3, warehouse 2 for product 4.
            assert_eq!(quantity(&stores, 3, 1), 4);
            assert_eq!(quantity(&stores, 3, 2), 10);
            assert_eq!(quantity(&stores, 4, 2), 2);
            assert_eq!(quantity(&stores, 4, 3), 8);

            assert_eq!(pipeline.lifecycle(seq), Some(OrderLifecycle::Notified { order_id }));

            let doc = stores.documents.find(&order_id).unwrap().expect("manifest stored");
            let manifest: ShipmentManifest = serde_json::from_slice(&doc.bytes).unwrap();
            assert_eq!(manifest.total_value, 395);
            assert_eq!(manifest.lines[0].product_name.as_deref(), Some("Widget"));
        }
    }

    #[test]
    fn out_of_stock_leaves_inventory_untouched() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);

            let pending = pipeline.submit(request(&[(5, 1000)])).unwrap();
            let seq = pending.sequence();
            let err = pending.wait().unwrap_err();
            pipeline.shutdown();

            assert_eq!(err, FulfillmentError::out_of_stock(ProductId::new(5), 1000));
            assert_eq!(quantity(&stores, 5, 1), 10);
            assert_eq!(quantity(&stores, 5, 2), 999);
            assert_eq!(quantity(&stores, 5, 3), 0);
            assert_eq!(stores.inventory.writes(), 0);
            assert!(stores.headers.is_empty());
            assert!(stores.documents.is_empty());
            assert_eq!(pipeline.lifecycle(seq), Some(OrderLifecycle::Rejected { reason: err }));
        }
    }

    #[test]
    fn invalid_request_reports_every_violation() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);

            let err = pipeline
                .submit(request(&[(0, 1), (2, 0)]))
                .unwrap()
                .wait()
                .unwrap_err();
            pipeline.shutdown();

            let v = err.violations().expect("validation failure");
            assert!(v.contains_path("OrderRequest", "items[0].product_id"));
            assert!(v.contains_path("OrderRequest", "items[1].quantity"));
            assert!(stores.headers.is_empty());
        }
    }

    #[test]
    fn builds_run_in_submission_order() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);
            let seen = Arc::new(Mutex::new(Vec::new()));
            pipeline.register_observer(recording_observer(seen.clone()));

            let pending: Vec<_> = (0..40u64)
                .map(|i| pipeline.submit(request(&[(1 + i % 2, 1)])).unwrap())
                .collect();
            assert!(pending.windows(2).all(|w| w[0].sequence() + 1 == w[1].sequence()));
            assert_eq!(pending[0].sequence(), 1);

            let ids: Vec<OrderId> = pending
                .into_iter()
                .map(|p| p.wait().unwrap().order_id.unwrap())
                .collect();
            pipeline.shutdown();

            assert!(ids.windows(2).all(|w| w[0] < w[1]), "{shape}: {ids:?}");
            assert_eq!(*seen.lock().unwrap(), ids);
        }
    }

    #[test]
    fn same_observer_registered_twice_runs_once_per_commit() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);

            let calls = Arc::new(AtomicUsize::new(0));
            let c = calls.clone();
            let observer: Arc<dyn CommitObserver<OrderHeader>> =
                Arc::new(move |_: &OrderHeader| -> Result<(), ObserverError> {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });

            assert!(pipeline.register_observer(observer.clone()));
            assert!(!pipeline.register_observer(observer));

            for _ in 0..3 {
                pipeline.submit(request(&[(2, 1)])).unwrap().wait().unwrap();
            }
            pipeline.shutdown();

            assert_eq!(calls.load(Ordering::SeqCst), 3);
        }
    }

    #[test]
    fn failing_and_panicking_observers_never_fail_the_commit() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);
            let seen = Arc::new(Mutex::new(Vec::new()));

            pipeline.register_observer(Arc::new(|_: &OrderHeader| -> Result<(), ObserverError> {
                Err(ObserverError::new("ledger offline"))
            }));
            pipeline.register_observer(Arc::new(|_: &OrderHeader| -> Result<(), ObserverError> {
                panic!("observer bug")
            }));
            pipeline.register_observer(recording_observer(seen.clone()));

            let pending = pipeline.submit(request(&[(1, 2)])).unwrap();
            let seq = pending.sequence();
            let header = pending.wait().unwrap();
            pipeline.shutdown();

            let order_id = header.order_id.unwrap();
            assert_eq!(*seen.lock().unwrap(), vec![order_id]);
            assert_eq!(pipeline.lifecycle(seq), Some(OrderLifecycle::Notified { order_id }));
        }
    }

    /// Documents store that refuses to store one order's manifest.
    struct FlakyDocuments {
        inner: InMemoryRecordStore<ShipmentDocument>,
        refuse: OrderId,
    }

    impl RecordStore<ShipmentDocument> for FlakyDocuments {
        fn find(&self, key: &OrderId) -> Result<Option<ShipmentDocument>, StoreError> {
            self.inner.find(key)
        }

        fn find_range(&self, low: &OrderId, high: &OrderId) -> Result<Vec<ShipmentDocument>, StoreError> {
            self.inner.find_range(low, high)
        }

        fn save(&self, record: ShipmentDocument) -> Result<OrderId, StoreError> {
            if record.order_id == self.refuse {
                return Err(StoreError::Unavailable("document archive offline".to_string()));
            }
            self.inner.save(record)
        }

        fn update(&self, key: &OrderId, record: ShipmentDocument) -> Result<(), StoreError> {
            self.inner.update(key, record)
        }

        fn delete(&self, key: &OrderId) -> Result<(), StoreError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn fanout_failure_is_isolated_to_its_order() {
        for shape in SHAPES {
            let stores = stores();
            let documents = Arc::new(FlakyDocuments {
                inner: InMemoryRecordStore::new(),
                refuse: OrderId::new(1),
            });
            let pipeline = FulfillmentPipeline::start(
                config(shape),
                stores.order_stores(),
                documents.clone(),
                Arc::new(JsonRenderer),
            )
            .unwrap();

            let first = pipeline.submit(request(&[(1, 1)])).unwrap();
            let second = pipeline.submit(request(&[(2, 1)])).unwrap();
            let (s1, s2) = (first.sequence(), second.sequence());
            assert_eq!(first.wait().unwrap().order_id, Some(OrderId::new(1)));
            assert_eq!(second.wait().unwrap().order_id, Some(OrderId::new(2)));
            pipeline.shutdown();

            let stats = pipeline.fanout_stats();
            assert_eq!((stats.dispatched, stats.succeeded, stats.failed), (2, 1, 1));
            assert!(documents.find(&OrderId::new(1)).unwrap().is_none());
            assert!(documents.find(&OrderId::new(2)).unwrap().is_some());

            // Fan-out failures never move an order back.
            assert!(matches!(pipeline.lifecycle(s1), Some(OrderLifecycle::Notified { .. })));
            assert!(matches!(pipeline.lifecycle(s2), Some(OrderLifecycle::Notified { .. })));
        }
    }

    #[test]
    fn shutdown_drains_and_freezes_inventory() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);

            let mut pending: Vec<_> = (0..30u64)
                .map(|i| pipeline.submit(request(&[(1 + i % 3, 1 + (i % 4) as u32)])).unwrap())
                .collect();
            pipeline.shutdown();

            assert!(pipeline.outstanding().is_empty());
            assert!(pending.iter_mut().all(|p| p.try_result().is_some()));

            let stats = pipeline.intake_stats();
            assert_eq!(stats.submitted, 30);
            assert_eq!(stats.committed + stats.rejected, 30);

            let writes = stores.inventory.writes();
            assert_eq!(
                pipeline.submit(request(&[(1, 1)])).unwrap_err(),
                IntakeError::Closed
            );
            thread::sleep(Duration::from_millis(50));
            assert_eq!(stores.inventory.writes(), writes);
        }
    }

    #[test]
    fn rollback_restores_earlier_lines() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);

            let err = pipeline
                .submit(request(&[(1, 5), (5, 1000)]))
                .unwrap()
                .wait()
                .unwrap_err();
            pipeline.shutdown();

            assert!(matches!(err, FulfillmentError::OutOfStock { .. }));
            assert_eq!(quantity(&stores, 1, 1), 50);
            assert!(stores.headers.is_empty());
            assert!(stores.items.is_empty());
        }
    }

    #[test]
    fn compensation_none_leaves_the_gap_visible() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start_with(
                config(shape).with_compensation(CompensationPolicy::None),
                &stores,
                OrderRules::standard(),
            );

            let err = pipeline
                .submit(request(&[(1, 5), (5, 1000)]))
                .unwrap()
                .wait()
                .unwrap_err();
            pipeline.shutdown();

            assert!(matches!(err, FulfillmentError::OutOfStock { .. }));
            assert_eq!(quantity(&stores, 1, 1), 45);
            assert_eq!(stores.headers.len(), 1);
            assert_eq!(stores.items.len(), 1);
            // Observers only ever see committed orders.
            assert_eq!(pipeline.fanout_stats().dispatched, 0);
        }
    }

    /// Line store that refuses every second line.
    struct FlakyItems {
        inner: Arc<InMemoryRecordStore<OrderItem>>,
    }

    impl RecordStore<OrderItem> for FlakyItems {
        fn find(&self, key: &ItemKey) -> Result<Option<OrderItem>, StoreError> {
            self.inner.find(key)
        }

        fn find_range(&self, low: &ItemKey, high: &ItemKey) -> Result<Vec<OrderItem>, StoreError> {
            self.inner.find_range(low, high)
        }

        fn save(&self, record: OrderItem) -> Result<ItemKey, StoreError> {
            if record.item_id == 2 {
                return Err(StoreError::Unavailable("line store offline".to_string()));
            }
            self.inner.save(record)
        }

        fn update(&self, key: &ItemKey, record: OrderItem) -> Result<(), StoreError> {
            self.inner.update(key, record)
        }

        fn delete(&self, key: &ItemKey) -> Result<(), StoreError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn store_failure_mid_build_is_rolled_back_and_intake_continues() {
        for shape in SHAPES {
            let stores = stores();
            let order_stores = OrderStores {
                items: Arc::new(FlakyItems {
                    inner: stores.items.clone(),
                }),
                ..stores.order_stores()
            };
            let pipeline = FulfillmentPipeline::start(
                config(shape),
                order_stores,
                stores.documents(),
                Arc::new(JsonRenderer),
            )
            .unwrap();

            let failing = pipeline.submit(request(&[(1, 5), (2, 1)])).unwrap();
            let next = pipeline.submit(request(&[(2, 3)])).unwrap();
            let (failing_seq, next_seq) = (failing.sequence(), next.sequence());

            let err = failing.wait().unwrap_err();
            assert!(matches!(err, FulfillmentError::StoreUnavailable(_)));
            let header = next.wait().unwrap();
            pipeline.shutdown();

            assert!(matches!(
                pipeline.lifecycle(failing_seq),
                Some(OrderLifecycle::Rejected { reason: FulfillmentError::StoreUnavailable(_) })
            ));
            assert!(matches!(pipeline.lifecycle(next_seq), Some(OrderLifecycle::Notified { .. })));

            // Line 1's allocation was re-credited; only the second order's units left stock.
            assert_eq!(quantity(&stores, 1, 1), 50);
            assert_eq!(quantity(&stores, 2, 1), 27);
            let order_id = header.order_id.unwrap();
            let headers: Vec<_> = stores.headers.snapshot().iter().filter_map(|h| h.order_id).collect();
            assert_eq!(headers, vec![order_id]);
            assert_eq!(stores.items.len(), 1);
        }
    }

    #[test]
    fn worker_recovers_after_a_panicking_build() {
        for shape in SHAPES {
            let stores = stores();
            let rules = OrderRules::standard().with_item_validator(|item: &OrderItem| -> Vec<Violation> {
                if item.product_id == ProductId::new(6) {
                    panic!("pricing rule exploded");
                }
                Vec::new()
            });
            let pipeline = start_with(config(shape), &stores, rules);

            let bad = pipeline.submit(request(&[(1, 5), (6, 1)])).unwrap();
            let good = pipeline.submit(request(&[(2, 1)])).unwrap();
            let bad_seq = bad.sequence();

            let err = bad.wait().unwrap_err();
            assert_eq!(err, FulfillmentError::WorkerPanicked("pricing rule exploded".to_string()));
            assert!(good.wait().is_ok());
            pipeline.shutdown();

            assert_eq!(pipeline.intake_stats().panicked, 1);
            assert!(matches!(
                pipeline.lifecycle(bad_seq),
                Some(OrderLifecycle::Rejected { reason: FulfillmentError::WorkerPanicked(_) })
            ));

            // The panicking order was rolled back like any other failure.
            assert_eq!(quantity(&stores, 1, 1), 50);
            assert_eq!(quantity(&stores, 6, 1), 100);
            assert_eq!(stores.headers.len(), 1);
            assert_eq!(stores.items.len(), 1);
            assert!(stores.items.snapshot().iter().all(|i| i.product_id == ProductId::new(2)));
        }
    }

    #[test]
    fn terminal_lifecycles_beyond_retention_are_evicted() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start_with(
                config(shape).with_lifecycle_retention(2),
                &stores,
                OrderRules::standard(),
            );

            let sequences: Vec<u64> = (0..5)
                .map(|_| {
                    let pending = pipeline.submit(request(&[(2, 1)])).unwrap();
                    let seq = pending.sequence();
                    pending.wait().unwrap();
                    seq
                })
                .collect();
            pipeline.shutdown();

            for seq in &sequences[..3] {
                assert_eq!(pipeline.lifecycle(*seq), None);
            }
            for seq in &sequences[3..] {
                assert!(matches!(pipeline.lifecycle(*seq), Some(OrderLifecycle::Notified { .. })));
            }
            // Eviction only drops lookup state, never the orders themselves.
            assert_eq!(stores.headers.len(), 5);
        }
    }

    #[test]
    fn pending_order_resolves_asynchronously() {
        for shape in SHAPES {
            let stores = stores();
            let pipeline = start(shape, &stores);

            // Holds the worker inside the first order's notification.
            let (gate_tx, gate_rx) = mpsc::channel::<()>();
            let gate_rx = Mutex::new(gate_rx);
            pipeline.register_observer(Arc::new(move |_: &OrderHeader| -> Result<(), ObserverError> {
                let _ = gate_rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
                Ok(())
            }));

            let first = pipeline.submit(request(&[(1, 1)])).unwrap();
            let mut second = pipeline.submit(request(&[(2, 1)])).unwrap();

            assert!(second.try_result().is_none());
            assert!(second.wait_timeout(Duration::from_millis(20)).is_none());
            assert!(matches!(
                pipeline.lifecycle(second.sequence()),
                Some(OrderLifecycle::Intake)
            ));

            gate_tx.send(()).unwrap();
            gate_tx.send(()).unwrap();

            assert!(first.wait().is_ok());
            assert!(matches!(second.wait_timeout(Duration::from_secs(5)), Some(Ok(_))));
            // A resolved handle keeps its outcome.
            assert!(matches!(second.try_result(), Some(Ok(_))));
            pipeline.shutdown();
        }
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 12,
                ..ProptestConfig::default()
            })]

            /// Property: with several callers submitting at once, every unit
            /// that left inventory belongs to a committed order, and committed
            /// orders were built in sequence order.
            #[test]
            fn concurrent_submissions_conserve_stock(
                orders in proptest::collection::vec(
                    proptest::collection::vec((1u64..=4, 1u32..8), 1..4),
                    1..24,
                ),
                ring in any::<bool>(),
            ) {
                let shape = if ring { IntakeShape::Ring } else { IntakeShape::Channel };
                let stores = stores();
                let initial: Vec<u64> = (1..=4).map(|p| on_hand(&stores, p)).collect();
                let pipeline = start(shape, &stores);

                let per_caller = orders.len().div_ceil(3);
                let outcomes: Vec<(u64, Vec<(u64, u32)>, Result<OrderHeader, FulfillmentError>)> =
                    thread::scope(|s| {
                        let callers: Vec<_> = orders
                            .chunks(per_caller)
                            .map(|chunk| {
                                let pipeline = &pipeline;
                                s.spawn(move || {
                                    let pending: Vec<_> = chunk
                                        .iter()
                                        .map(|lines| (lines.clone(), pipeline.submit(request(lines)).unwrap()))
                                        .collect();
                                    pending
                                        .into_iter()
                                        .map(|(lines, p)| (p.sequence(), lines, p.wait()))
                                        .collect::<Vec<_>>()
                                })
                            })
                            .collect();
                        callers.into_iter().flat_map(|c| c.join().unwrap()).collect()
                    });
                pipeline.shutdown();

                let mut allocated: BTreeMap<u64, u64> = BTreeMap::new();
                let mut committed: Vec<(u64, OrderId)> = Vec::new();
                for (seq, lines, outcome) in &outcomes {
                    match outcome {
                        Ok(header) => {
                            for &(p, q) in lines {
                                *allocated.entry(p).or_default() += u64::from(q);
                            }
                            committed.push((*seq, header.order_id.unwrap()));
                        }
                        Err(FulfillmentError::OutOfStock { .. }) => {}
                        Err(other) => prop_assert!(false, "unexpected rejection {other:?}"),
                    }
                }

                for p in 1..=4u64 {
                    let taken = allocated.get(&p).copied().unwrap_or(0);
                    prop_assert_eq!(on_hand(&stores, p), initial[(p - 1) as usize] - taken);
                }

                committed.sort_unstable();
                prop_assert!(committed.windows(2).all(|w| w[0].1 < w[1].1));
                prop_assert_eq!(stores.headers.len(), committed.len());
                prop_assert!(pipeline.outstanding().is_empty());
            }
        }
    }
}

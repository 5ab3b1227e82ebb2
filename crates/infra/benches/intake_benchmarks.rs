use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use orderflow_core::{CustomerId, ProductId, SalesmanId, WarehouseId};
use orderflow_infra::documents::JsonRenderer;
use orderflow_infra::intake::{ChannelExecutor, IntakeShape, OrderedExecutor, RingBufferExecutor};
use orderflow_infra::{FulfillmentPipeline, InMemoryStores, PipelineConfig};
use orderflow_inventory::InventoryRecord;
use orderflow_products::Product;
use orderflow_sales::OrderRequest;

const SHAPES: [IntakeShape; 2] = [IntakeShape::Channel, IntakeShape::Ring];

fn executor(shape: IntakeShape) -> Box<dyn OrderedExecutor> {
    match shape {
        IntakeShape::Channel => Box::new(ChannelExecutor::spawn("bench-channel", 1024).unwrap()),
        IntakeShape::Ring => Box::new(RingBufferExecutor::spawn("bench-ring", 1024).unwrap()),
    }
}

/// Raw handoff cost: no-op tasks through each executor, drained by shutdown.
fn bench_executor_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor_handoff");

    for tasks in [1_000u64, 10_000] {
        group.throughput(Throughput::Elements(tasks));
        for shape in SHAPES {
            group.bench_with_input(BenchmarkId::new(shape.as_str(), tasks), &tasks, |b, &tasks| {
                b.iter_batched(
                    || executor(shape),
                    |exec| {
                        let counter = Arc::new(AtomicU64::new(0));
                        for _ in 0..tasks {
                            let counter = counter.clone();
                            exec.execute(Box::new(move || {
                                counter.fetch_add(1, Ordering::Relaxed);
                            }))
                            .unwrap();
                        }
                        exec.shutdown();
                        black_box(counter.load(Ordering::Relaxed))
                    },
                    BatchSize::PerIteration,
                );
            });
        }
    }

    group.finish();
}

fn seeded_stores() -> InMemoryStores {
    let products = (1..=8).map(|p| Product::new(ProductId::new(p), format!("p{p}"), 100 + p, 200 + p));
    let stock = (1..=8).flat_map(|p| {
        (1..=4).map(move |w| InventoryRecord::new(ProductId::new(p), WarehouseId::new(w), 1_000_000))
    });
    InMemoryStores::seeded(products, stock).unwrap()
}

/// End-to-end order throughput: submit, build, notify, render manifests.
fn bench_pipeline_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_orders");
    group.sample_size(20);

    for orders in [100u64, 1_000] {
        group.throughput(Throughput::Elements(orders));
        for shape in SHAPES {
            group.bench_with_input(BenchmarkId::new(shape.as_str(), orders), &orders, |b, &orders| {
                b.iter_batched(
                    || {
                        let stores = seeded_stores();
                        let config = PipelineConfig::default()
                            .with_name(format!("bench-{shape}"))
                            .with_intake_shape(shape)
                            .with_intake_capacity(256);
                        let pipeline = FulfillmentPipeline::start(
                            config,
                            stores.order_stores(),
                            stores.documents(),
                            Arc::new(JsonRenderer),
                        )
                        .unwrap();
                        (stores, pipeline)
                    },
                    |(_stores, pipeline)| {
                        let pending: Vec<_> = (0..orders)
                            .map(|i| {
                                let req = OrderRequest::new(CustomerId::new(1 + i % 50), SalesmanId::new(1))
                                    .with_item(ProductId::new(1 + i % 8), 1)
                                    .with_item(ProductId::new(1 + (i + 3) % 8), 2);
                                pipeline.submit(req).unwrap()
                            })
                            .collect();
                        for p in pending {
                            black_box(p.wait().unwrap());
                        }
                        pipeline.shutdown();
                    },
                    BatchSize::PerIteration,
                );
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_executor_handoff, bench_pipeline_orders);
criterion_main!(benches);

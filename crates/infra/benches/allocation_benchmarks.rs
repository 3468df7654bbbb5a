use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use allocation_core::Sku;
use allocation_domain::{AllocationEvent, AllocationRequired, Batch, BatchCreated, OrderLine, Product};
use allocation_infra::{build_message_bus, AllocationBus, InMemoryNotifier, InMemoryProductStore, UnitOfWork};
use allocation_observability::ObservabilityConfig;

type Store = Arc<InMemoryProductStore>;

fn sku() -> Sku {
    "BENCH-SKU".parse().unwrap()
}

/// Product with `count` batches, every other one still in transit.
fn product_with_batches(count: u32) -> Product {
    let batches = (0..count)
        .map(|i| {
            let eta = (i % 2 == 1).then(|| {
                chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap() + chrono::Days::new(u64::from(i))
            });
            Batch::new(format!("batch-{i}").parse().unwrap(), sku(), 1_000_000, eta)
        })
        .collect();
    Product::restore(sku(), batches, 0).unwrap()
}

fn seeded_bus(batches: u32) -> (AllocationBus<Store>, UnitOfWork<Store>) {
    let store = Arc::new(InMemoryProductStore::new());
    let bus = build_message_bus(Arc::new(InMemoryNotifier::new("stock@made.com")));
    let mut uow = UnitOfWork::new(store);
    for i in 0..batches {
        let event: AllocationEvent = BatchCreated {
            reference: format!("batch-{i}").parse().unwrap(),
            sku: sku(),
            qty: 1_000_000,
            eta: None,
        }
        .into();
        bus.handle(event, &mut uow).unwrap();
    }
    (bus, uow)
}

/// Allocation policy alone: sort batches and pick the first that fits.
fn bench_product_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("product_allocate");

    for batch_count in [1u32, 10, 100].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("batches", batch_count),
            batch_count,
            |b, &batch_count| {
                let mut product = product_with_batches(batch_count);
                let mut n = 0u64;
                b.iter(|| {
                    n += 1;
                    let line = OrderLine::new(format!("o{n}").parse().unwrap(), sku(), 1).unwrap();
                    black_box(product.allocate(&line).is_some())
                });
            },
        );
    }

    group.finish();
}

/// Full pipeline: bus → handler → unit of work → in-memory store.
fn bench_bus_allocate(c: &mut Criterion) {
    // Spans and filtered events stay on the measured path; nothing is written.
    allocation_observability::init_with(&ObservabilityConfig::default().with_default_filter("warn"));

    let mut group = c.benchmark_group("bus_allocate");
    group.throughput(Throughput::Elements(1));

    group.bench_function("allocation_required", |b| {
        let (bus, mut uow) = seeded_bus(10);
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let event: AllocationEvent = AllocationRequired {
                order_id: format!("o{n}").parse().unwrap(),
                sku: sku(),
                qty: 1,
            }
            .into();
            black_box(bus.handle(event, &mut uow).unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_product_allocate, bench_bus_allocate);
criterion_main!(benches);

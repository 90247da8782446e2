//! Performance benchmarks for the booking store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use classbook::{
    group_by_date, month_grid, Participant, SlotFilter, Store, StoreConfig, YearMonth,
};
use tempfile::TempDir;

fn create_store(dir: &TempDir) -> Store {
    Store::create(StoreConfig {
        sync_every: 1000,
        ..StoreConfig::at(dir.path().join("store"))
    })
    .unwrap()
}

fn teacher() -> Participant {
    Participant::teacher("t-rao", "Ms. Rao")
}

/// Benchmark journaled slot creation
fn bench_create_slot(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    let teacher = teacher();

    c.bench_function("create_slot", |b| {
        b.iter(|| {
            black_box(
                store
                    .create_slot(&teacher, "2025-07-10", "14:00", "Algebra")
                    .unwrap(),
            );
        });
    });
}

/// Benchmark booking with a varying number of live views watching other teachers
fn bench_book_slot(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_slot");

    for subscribers in [0, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &count| {
                let store = Store::in_memory(StoreConfig::in_memory());
                let teacher = teacher();
                let _views: Vec<_> = (0..count)
                    .map(|i| store.list_open_slots(SlotFilter::for_teacher(format!("t-{}", i))))
                    .collect();

                b.iter(|| {
                    let slot = store
                        .create_slot(&teacher, "2025-07-10", "14:00", "Algebra")
                        .unwrap();
                    black_box(store.book_slot(slot.id, "s-ana", "Ana").unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark calendar projection over a month of open slots
fn bench_month_projection(c: &mut Criterion) {
    let store = Store::in_memory(StoreConfig::in_memory());
    let teacher = teacher();
    for day in 1..=31 {
        store
            .create_slot_range(
                &teacher,
                &format!("2025-07-{:02}", day),
                "09:00",
                "20:30",
                "Algebra",
            )
            .unwrap();
    }
    let month = YearMonth::new(2025, 7).unwrap();

    c.bench_function("month_projection", |b| {
        b.iter(|| {
            let open = store.open_slots(&SlotFilter::for_teacher("t-rao"));
            let groups = group_by_date(&open);
            black_box(month_grid(month, &groups));
        });
    });
}

criterion_group!(
    benches,
    bench_create_slot,
    bench_book_slot,
    bench_month_projection
);
criterion_main!(benches);

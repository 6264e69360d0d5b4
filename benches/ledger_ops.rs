//! Benchmarks for ledger ingestion and queries.

use std::sync::Arc;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bookstore_ledger::analytics;
use bookstore_ledger::config::LedgerConfig;
use bookstore_ledger::ledger::PurchaseLedger;
use bookstore_ledger::model::{Book, City, Customer, Employee, Item, Money, Purchase, Shop};
use bookstore_ledger::store::MemStore;

fn purchase(year: i32, n: u32) -> Purchase {
    let vienna = City::new("Vienna", "Austria");
    let berlin = City::new("Berlin", "Germany");
    let shop = if n % 3 == 0 {
        Shop::new(2, "Berlin Mitte", berlin)
    } else {
        Shop::new(1, "Vienna Center", vienna.clone())
    };
    let items = (0..3)
        .map(|i| {
            let id = (n + i) % 50;
            let book = Book::new(id, format!("Book {id}"), Money(500 + u64::from(id) * 10));
            Item::new(book, 1 + i).unwrap()
        })
        .collect();
    let timestamp = NaiveDate::from_yo_opt(year, 1 + n % 360)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    Purchase::new(
        shop,
        Employee::new(n % 7, format!("Employee {}", n % 7)),
        Customer::new(n % 200, format!("Customer {}", n % 200), vienna),
        timestamp,
        items,
    )
    .unwrap()
}

fn mem_ledger() -> PurchaseLedger {
    PurchaseLedger::new(Arc::new(MemStore::new()), &LedgerConfig::default())
}

fn bench_add(c: &mut Criterion) {
    let ledger = mem_ledger();
    let mut n = 0;

    c.bench_function("add_purchase", |bench| {
        bench.iter(|| {
            n += 1;
            ledger.add(black_box(purchase(2024, n))).unwrap()
        })
    });
}

fn bench_bulk_init(c: &mut Criterion) {
    let ledger = mem_ledger();
    let batch: Vec<_> = (0..1_000).map(|n| purchase(2019, n)).collect();

    c.bench_function("bulk_init_1k", |bench| {
        bench.iter(|| black_box(ledger.bulk_init(2019, batch.clone()).unwrap()))
    });
}

fn bench_best_sellers(c: &mut Criterion) {
    let ledger = mem_ledger();
    for n in 0..5_000 {
        ledger.add(purchase(2024, n)).unwrap();
    }

    c.bench_function("best_sellers_5k", |bench| {
        bench.iter(|| black_box(analytics::best_sellers_in_year(&ledger, 2024).unwrap()))
    });
}

fn bench_reload(c: &mut Criterion) {
    let ledger = mem_ledger();
    ledger
        .bulk_init(2020, (0..5_000).map(|n| purchase(2020, n)).collect())
        .unwrap();

    c.bench_function("evict_reload_5k", |bench| {
        bench.iter(|| {
            let count = ledger.compute_by_year(2020, |ps| ps.len()).unwrap();
            ledger.clear(2020);
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_add, bench_bulk_init, bench_best_sellers, bench_reload);
criterion_main!(benches);

//! Shared fixtures: a tiny catalogue of books, shops, staff and customers.

#![allow(dead_code)] // Not every test file uses every fixture

use std::sync::Arc;

use bookstore_ledger::config::LedgerConfig;
use bookstore_ledger::ledger::PurchaseLedger;
use bookstore_ledger::model::{Book, City, Customer, Employee, Item, Money, Purchase, Shop};
use bookstore_ledger::store::MemStore;
use chrono::{NaiveDate, NaiveDateTime};

pub fn vienna() -> City {
    City::new("Vienna", "Austria")
}

pub fn graz() -> City {
    City::new("Graz", "Austria")
}

pub fn berlin() -> City {
    City::new("Berlin", "Germany")
}

pub fn dune() -> Book {
    Book::new(1, "Dune", Money(1_990))
}

pub fn emma() -> Book {
    Book::new(2, "Emma", Money(899))
}

pub fn ulysses() -> Book {
    Book::new(3, "Ulysses", Money(2_450))
}

pub fn shop(id: u32, city: City) -> Shop {
    Shop::new(id, format!("Shop {id}"), city)
}

pub fn employee(id: u32) -> Employee {
    Employee::new(id, format!("Employee {id}"))
}

pub fn customer(id: u32, city: City) -> Customer {
    Customer::new(id, format!("Customer {id}"), city)
}

pub fn at(year: i32, day: u32) -> NaiveDateTime {
    NaiveDate::from_yo_opt(year, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn purchase(
    shop: Shop,
    employee: Employee,
    customer: Customer,
    timestamp: NaiveDateTime,
    items: &[(Book, u32)],
) -> Purchase {
    Purchase::new(
        shop,
        employee,
        customer,
        timestamp,
        items
            .iter()
            .map(|(book, amount)| Item::new(book.clone(), *amount).unwrap())
            .collect(),
    )
    .unwrap()
}

/// A local purchase in shop 1 (Vienna) by employee 1.
pub fn simple(year: i32, customer_id: u32, items: &[(Book, u32)]) -> Purchase {
    purchase(
        shop(1, vienna()),
        employee(1),
        customer(customer_id, vienna()),
        at(year, 1 + customer_id % 300),
        items,
    )
}

/// A memory-backed ledger and a handle on its store.
pub fn mem_ledger() -> (PurchaseLedger, Arc<MemStore>) {
    let store = Arc::new(MemStore::new());
    let ledger = PurchaseLedger::new(store.clone(), &LedgerConfig::default());
    (ledger, store)
}

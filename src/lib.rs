// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # bookstore-ledger
//!
//! A time-partitioned purchase ledger for bookstore sales, with lazily
//! loaded yearly partitions and sales analytics on top.
//!
//! ## Architecture
//!
//! - **Stripe locks** (`stripe`): fixed pool of `RwLock`s, one chosen per year
//! - **Partition cells** (`lazy`): resident / evicted / absent cache cells with
//!   reload from the durable store
//! - **Year partitions** (`partition`): purchases indexed by shop, employee and
//!   customer
//! - **Ledger** (`ledger`): year → partition map with ingestion and scoped queries
//! - **Analytics** (`analytics`): best sellers, revenue, employee of the year,
//!   foreign purchases
//! - **Storage** (`store`): redb-backed durable store and an in-memory store
//!
//! ## Library usage
//!
//! ```no_run
//! use bookstore_ledger::analytics;
//! use bookstore_ledger::config::LedgerConfig;
//! use bookstore_ledger::model::{Book, City, Customer, Employee, Item, Money, Purchase, Shop};
//!
//! let ledger = LedgerConfig::persistent("./ledger-data").open_ledger().unwrap();
//! let vienna = City::new("Vienna", "Austria");
//! let purchase = Purchase::new(
//!     Shop::new(1, "Kärntner Straße", vienna.clone()),
//!     Employee::new(1, "Ada"),
//!     Customer::new(1, "Bo", vienna),
//!     chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(10, 0, 0).unwrap(),
//!     vec![Item::new(Book::new(1, "Dune", Money(1_990)), 2).unwrap()],
//! )
//! .unwrap();
//! ledger.add(purchase).unwrap();
//! let best = analytics::best_sellers_in_year(&ledger, 2024).unwrap();
//! assert_eq!(best[0].amount, 2);
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod lazy;
pub mod ledger;
pub mod model;
pub mod partition;
pub mod store;
pub mod stripe;

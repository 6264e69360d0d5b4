//! Persistence and recovery tests for the ledger.
//!
//! These tests verify that partitions and the year index survive a restart
//! (persist + reopen cycle) on the redb-backed store.

mod common;

use std::sync::Arc;

use bookstore_ledger::analytics;
use bookstore_ledger::config::LedgerConfig;
use bookstore_ledger::lazy::PartitionState;
use bookstore_ledger::ledger::PurchaseLedger;
use bookstore_ledger::model::{Money, ShopId};
use bookstore_ledger::store::{DurableStore, PartitionStore};

use common::*;

fn persistent_ledger(dir: &std::path::Path) -> PurchaseLedger {
    LedgerConfig::persistent(dir).open_ledger().unwrap()
}

#[test]
fn purchases_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    // First session: live purchases and a historical load.
    {
        let ledger = persistent_ledger(dir.path());
        ledger.add(simple(2024, 1, &[(dune(), 2)])).unwrap();
        ledger.add(simple(2024, 2, &[(emma(), 1)])).unwrap();
        ledger
            .bulk_init(2021, vec![simple(2021, 5, &[(ulysses(), 4)])])
            .unwrap();
    }

    // Second session: everything comes back evicted and reloads on demand.
    {
        let ledger = persistent_ledger(dir.path());
        assert_eq!(ledger.years(), Some(2021..=2024));
        assert!(
            ledger
                .info()
                .partitions
                .iter()
                .all(|p| p.state == PartitionState::Evicted && p.stored)
        );

        assert_eq!(ledger.compute_by_year(2024, |ps| ps.len()).unwrap(), 2);
        assert_eq!(
            analytics::revenue_of_shop_in_year(&ledger, ShopId(1), 2021).unwrap(),
            Money(2_450 * 4)
        );
        assert_eq!(ledger.info().resident_years(), 2);
    }
}

#[test]
fn evict_and_reload_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let ledger = persistent_ledger(dir.path());
    let p = simple(2023, 1, &[(dune(), 1), (emma(), 2)]);
    ledger.add(p.clone()).unwrap();

    let evicted = ledger.clear(2023).unwrap();
    assert_eq!(evicted.purchases().next(), Some(&p));

    let reloaded = ledger
        .compute_by_year(2023, |ps| ps.iter().map(|q| (*q).clone()).collect::<Vec<_>>())
        .unwrap();
    assert_eq!(reloaded, vec![p]);
}

#[test]
fn writes_after_reopen_extend_the_year() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let ledger = persistent_ledger(dir.path());
        ledger.add(simple(2022, 1, &[(dune(), 1)])).unwrap();
    }
    {
        let ledger = persistent_ledger(dir.path());
        ledger.add(simple(2022, 2, &[(dune(), 1)])).unwrap();
        ledger.add(simple(2025, 3, &[(dune(), 1)])).unwrap();
    }

    let ledger = persistent_ledger(dir.path());
    assert_eq!(ledger.years(), Some(2022..=2025));
    assert_eq!(ledger.compute_by_year(2022, |ps| ps.len()).unwrap(), 2);
}

#[test]
fn lost_partition_surfaces_as_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(DurableStore::open(dir.path()).unwrap());
    // Index claims a year whose partition was never written.
    store.persist_years(&[2010]).unwrap();

    let ledger = PurchaseLedger::open(store, &LedgerConfig::default()).unwrap();
    let err = ledger.compute_by_year(2010, |ps| ps.len()).unwrap_err();
    assert!(err.to_string().contains("2010"));
}

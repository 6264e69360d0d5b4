//! The year-partitioned purchase ledger.
//!
//! [`PurchaseLedger`] maps each calendar year to a [`LazyPartitionRef`].
//! Every operation on a year runs under that year's stripe of a
//! [`StripedLock`]: writers (`add`, `bulk_init`, `clear`) take it exclusively,
//! queries (`compute_by_*`) share it for the whole transform, so a partition
//! can never be evicted while a query is still walking it.
//!
//! The persisted year index spans all years, so it has its own mutex and is
//! rewritten from the full key set whenever that set is ahead of the store.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::Serialize;

use crate::config::LedgerConfig;
use crate::error::{LedgerResult, ValidationError};
use crate::lazy::{LazyPartitionRef, PartitionState};
use crate::model::{Customer, CustomerId, EmployeeId, Purchase, Shop, ShopId};
use crate::partition::YearPartition;
use crate::store::{PartitionStore, StoreResult};
use crate::stripe::StripedLock;

/// Time-partitioned store of purchases.
pub struct PurchaseLedger {
    partitions: DashMap<i32, Arc<LazyPartitionRef>>,
    locks: StripedLock,
    store: Arc<dyn PartitionStore>,
    /// Year index as last written to the store.
    saved_years: Mutex<Vec<i32>>,
}

impl fmt::Debug for PurchaseLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseLedger")
            .field("years", &self.partitions.len())
            .field("locks", &self.locks)
            .finish()
    }
}

impl PurchaseLedger {
    /// Create an empty ledger writing to `store`.
    pub fn new(store: Arc<dyn PartitionStore>, config: &LedgerConfig) -> Self {
        Self {
            partitions: DashMap::new(),
            locks: StripedLock::new(config.stripes),
            store,
            saved_years: Mutex::new(Vec::new()),
        }
    }

    /// Open a ledger over previously persisted data.
    ///
    /// Every year in the stored index is registered as evicted and is
    /// reloaded on first access.
    pub fn open(store: Arc<dyn PartitionStore>, config: &LedgerConfig) -> StoreResult<Self> {
        let years = store.load_years()?;
        let ledger = Self::new(store, config);
        *ledger.saved_years.lock().expect("year index lock poisoned") = years.clone();
        for &year in &years {
            ledger
                .partitions
                .insert(year, Arc::new(LazyPartitionRef::evicted(year)));
        }
        tracing::info!(years = years.len(), "opened purchase ledger");
        Ok(ledger)
    }

    fn partition(&self, year: i32) -> Option<Arc<LazyPartitionRef>> {
        // Clone out so no DashMap shard guard outlives this call.
        self.partitions.get(&year).map(|entry| Arc::clone(entry.value()))
    }

    fn sorted_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.partitions.iter().map(|e| *e.key()).collect();
        years.sort_unstable();
        years
    }

    /// Write the year index if the in-memory key set has grown past it.
    ///
    /// The key set is read while holding the index mutex, so a writer can
    /// never replace a newer index with an older snapshot.
    fn sync_years(&self) -> StoreResult<()> {
        let mut saved = self.saved_years.lock().expect("year index lock poisoned");
        let years = self.sorted_years();
        if *saved != years {
            self.store.persist_years(&years)?;
            tracing::debug!(years = years.len(), "persisted year index");
            *saved = years;
        }
        Ok(())
    }

    /// Record one purchase under its calendar year and persist the year.
    pub fn add(&self, purchase: Purchase) -> LedgerResult<()> {
        let year = purchase.year();
        self.locks.write(&year, || -> LedgerResult<()> {
            let store = self.store.as_ref();
            match self.partition(year) {
                Some(cell) => {
                    cell.update(store, |partition| partition.add(purchase))?;
                    cell.persist(store)?;
                }
                None => {
                    let cell = Arc::new(LazyPartitionRef::resident(
                        YearPartition::from_purchases(year, [purchase]),
                    ));
                    self.partitions.insert(year, Arc::clone(&cell));
                    tracing::debug!(year, "created year partition");
                    cell.persist(store)?;
                }
            }
            // Also catches up a year whose first persist failed.
            self.sync_years()?;
            Ok(())
        })
    }

    /// Replace `year` with a partition built from `purchases`, persist it and
    /// evict it straight away.
    ///
    /// Returns the distinct customers seen in the load, ordered by id.
    pub fn bulk_init(&self, year: i32, purchases: Vec<Purchase>) -> LedgerResult<Vec<Customer>> {
        if let Some(stray) = purchases.iter().find(|p| p.year() != year) {
            return Err(ValidationError::YearMismatch {
                expected: year,
                actual: stray.year(),
            }
            .into());
        }

        self.locks.write(&year, || -> LedgerResult<Vec<Customer>> {
            let store = self.store.as_ref();
            let partition = YearPartition::from_purchases(year, purchases);
            let count = partition.len();
            let customers = partition.customers();

            let cell = match self.partition(year) {
                Some(cell) => {
                    cell.set(partition);
                    cell
                }
                None => {
                    let cell = Arc::new(LazyPartitionRef::resident(partition));
                    self.partitions.insert(year, Arc::clone(&cell));
                    cell
                }
            };
            cell.persist(store)?;
            self.sync_years()?;
            cell.clear();

            tracing::info!(
                year,
                purchases = count,
                customers = customers.len(),
                "bulk loaded year"
            );
            Ok(customers)
        })
    }

    /// Evict `year` from memory if it is durable; see [`LazyPartitionRef::clear`].
    ///
    /// Returns the released partition for transient use.
    pub fn clear(&self, year: i32) -> Option<YearPartition> {
        self.locks.write(&year, || {
            let evicted = self.partition(year)?.clear();
            if let Some(partition) = &evicted {
                tracing::info!(year, purchases = partition.len(), "evicted partition");
            }
            evicted
        })
    }

    /// First and last year with a partition, or `None` for an empty ledger.
    pub fn years(&self) -> Option<RangeInclusive<i32>> {
        let mut keys = self.partitions.iter().map(|e| *e.key());
        let first = keys.next()?;
        let (min, max) = keys.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Some(min..=max)
    }

    /// Run `scope` over the partition of `year` under its read lock, then
    /// hand the selected purchases to `f`.
    fn compute<R>(
        &self,
        year: i32,
        scope: impl for<'p> FnOnce(&'p YearPartition) -> Vec<&'p Purchase>,
        f: impl FnOnce(&[&Purchase]) -> R,
    ) -> LedgerResult<R> {
        self.locks.read(&year, || -> LedgerResult<R> {
            let Some(cell) = self.partition(year) else {
                return Ok(f(&[]));
            };
            let result = cell.get(self.store.as_ref(), |partition| match partition {
                Some(partition) => f(scope(partition).as_slice()),
                None => f(&[]),
            })?;
            Ok(result)
        })
    }

    /// Apply `f` to every purchase of `year`.
    pub fn compute_by_year<R>(&self, year: i32, f: impl FnOnce(&[&Purchase]) -> R) -> LedgerResult<R> {
        self.compute(year, |p| p.purchases().collect(), f)
    }

    /// Apply `f` to the purchases of one shop in `year`.
    pub fn compute_by_shop_and_year<R>(
        &self,
        shop: ShopId,
        year: i32,
        f: impl FnOnce(&[&Purchase]) -> R,
    ) -> LedgerResult<R> {
        self.compute(year, |p| p.by_shop(shop).iter().map(|p| &**p).collect(), f)
    }

    /// Apply `f` to the purchases of every shop matching `predicate` in `year`.
    pub fn compute_by_shops_and_year<R>(
        &self,
        predicate: impl Fn(&Shop) -> bool,
        year: i32,
        f: impl FnOnce(&[&Purchase]) -> R,
    ) -> LedgerResult<R> {
        self.compute(year, |p| p.by_shops(predicate), f)
    }

    /// Apply `f` to the purchases handled by one employee in `year`.
    pub fn compute_by_employee_and_year<R>(
        &self,
        employee: EmployeeId,
        year: i32,
        f: impl FnOnce(&[&Purchase]) -> R,
    ) -> LedgerResult<R> {
        self.compute(year, |p| p.by_employee(employee).iter().map(|p| &**p).collect(), f)
    }

    /// Apply `f` to the purchases of one customer in `year`.
    pub fn compute_by_customer_and_year<R>(
        &self,
        customer: CustomerId,
        year: i32,
        f: impl FnOnce(&[&Purchase]) -> R,
    ) -> LedgerResult<R> {
        self.compute(year, |p| p.by_customer(customer).iter().map(|p| &**p).collect(), f)
    }

    /// Snapshot of every year's cache state.
    pub fn info(&self) -> LedgerInfo {
        let partitions: BTreeMap<i32, Arc<LazyPartitionRef>> = self
            .partitions
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();
        LedgerInfo {
            stripes: self.locks.stripe_count(),
            partitions: partitions
                .into_values()
                .map(|cell| PartitionInfo {
                    year: cell.year(),
                    state: cell.state(),
                    stored: cell.is_stored(),
                    purchases: cell.resident_len(),
                })
                .collect(),
        }
    }
}

/// Cache state of one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionInfo {
    pub year: i32,
    pub state: PartitionState,
    pub stored: bool,
    /// Only known while resident.
    pub purchases: Option<usize>,
}

/// Summary of a ledger, one entry per year in ascending order.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerInfo {
    pub stripes: usize,
    pub partitions: Vec<PartitionInfo>,
}

impl LedgerInfo {
    /// Number of years currently held in memory.
    pub fn resident_years(&self) -> usize {
        self.partitions
            .iter()
            .filter(|p| p.state == PartitionState::Resident)
            .count()
    }
}

impl fmt::Display for LedgerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Years: {} ({} resident)", self.partitions.len(), self.resident_years())?;
        writeln!(f, "Lock stripes: {}", self.stripes)?;
        for p in &self.partitions {
            write!(f, "  {}: {}", p.year, p.state)?;
            if let Some(n) = p.purchases {
                write!(f, ", {n} purchases")?;
            }
            if !p.stored {
                write!(f, " (unsaved)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

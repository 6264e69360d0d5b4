//! In-memory partition store backed by DashMap.
//!
//! Keeps encoded snapshots in a concurrent hashmap. Reloads decode a fresh
//! copy, exactly like the durable backend, but all data is lost on process
//! exit.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::error::StoreError;
use crate::partition::YearPartition;
use crate::store::{PartitionStore, StoreResult, decode_partition, encode_partition};

/// Concurrent in-memory store using a sharded hashmap.
#[derive(Debug, Default)]
pub struct MemStore {
    partitions: DashMap<i32, Vec<u8>>,
    years: RwLock<Vec<i32>>,
    writes: AtomicUsize,
    reloads: AtomicUsize,
}

impl MemStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a partition for `year` has been written.
    pub fn contains(&self, year: i32) -> bool {
        self.partitions.contains_key(&year)
    }

    /// Remove a stored partition, returning its encoded bytes.
    pub fn remove(&self, year: i32) -> Option<Vec<u8>> {
        self.partitions.remove(&year).map(|(_, v)| v)
    }

    /// Number of stored partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Total successful partition writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Total successful partition reloads.
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }
}

impl PartitionStore for MemStore {
    fn persist_partition(&self, year: i32, partition: &YearPartition) -> StoreResult<()> {
        self.partitions.insert(year, encode_partition(partition)?);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn reload_partition(&self, year: i32) -> StoreResult<YearPartition> {
        let partition = {
            let bytes = self
                .partitions
                .get(&year)
                .ok_or(StoreError::PartitionMissing { year })?;
            decode_partition(year, bytes.value())?
        };
        self.reloads.fetch_add(1, Ordering::Relaxed);
        Ok(partition)
    }

    fn persist_years(&self, years: &[i32]) -> StoreResult<()> {
        let mut stored = self.years.write().expect("years lock poisoned");
        *stored = years.to_vec();
        Ok(())
    }

    fn load_years(&self) -> StoreResult<Vec<i32>> {
        Ok(self.years.read().expect("years lock poisoned").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Book, City, Customer, Employee, Item, Money, Purchase, Shop};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn partition(year: i32) -> YearPartition {
        let city = City::new("Oslo", "Norway");
        let purchase = Purchase::new(
            Shop::new(1, "Main", city.clone()),
            Employee::new(1, "Ada"),
            Customer::new(1, "Bo", city),
            NaiveDate::from_ymd_opt(year, 2, 2)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
            vec![Item::new(Book::new(1, "Dune", Money(500)), 4).unwrap()],
        )
        .unwrap();
        YearPartition::from_purchases(year, [purchase])
    }

    #[test]
    fn persist_and_reload() {
        let store = MemStore::new();
        store.persist_partition(2022, &partition(2022)).unwrap();
        assert!(store.contains(2022));
        let reloaded = store.reload_partition(2022).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.reload_count(), 1);
    }

    #[test]
    fn reload_of_removed_partition_fails() {
        let store = MemStore::new();
        store.persist_partition(2022, &partition(2022)).unwrap();
        assert!(store.remove(2022).is_some());
        assert!(matches!(
            store.reload_partition(2022),
            Err(StoreError::PartitionMissing { year: 2022 })
        ));
        assert_eq!(store.reload_count(), 0);
    }

    #[test]
    fn years_round_trip() {
        let store = MemStore::new();
        assert!(store.load_years().unwrap().is_empty());
        store.persist_years(&[2020, 2021]).unwrap();
        store.persist_years(&[2020, 2021, 2022]).unwrap();
        assert_eq!(store.load_years().unwrap(), vec![2020, 2021, 2022]);
    }

    #[test]
    fn concurrent_access() {
        let store = Arc::new(MemStore::new());
        let handles: Vec<_> = (2000..2050)
            .map(|year| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.persist_partition(year, &partition(year)).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 50);
    }
}

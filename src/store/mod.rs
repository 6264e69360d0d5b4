//! Durable storage for yearly partitions.
//!
//! The ledger only talks to a [`PartitionStore`]; two backends implement it:
//!
//! - [`DurableStore`]: ACID redb database on disk
//! - [`MemStore`]: process-local DashMap, for memory-only ledgers and tests
//!
//! Both keep partitions as bincode-encoded snapshots, so a reload always
//! yields a fresh copy rebuilt from the stored purchases.

pub mod durable;
pub mod mem;

pub use durable::DurableStore;
pub use mem::MemStore;

use crate::error::StoreError;
use crate::partition::{SNAPSHOT_VERSION, Snapshot, YearPartition};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What the ledger needs from a durable store.
///
/// Every write is an idempotent overwrite. Failures are reported as-is; the
/// ledger never retries.
pub trait PartitionStore: Send + Sync {
    /// Durably record the full content of one year.
    fn persist_partition(&self, year: i32, partition: &YearPartition) -> StoreResult<()>;

    /// Rebuild a previously persisted year.
    fn reload_partition(&self, year: i32) -> StoreResult<YearPartition>;

    /// Durably record the set of years the ledger knows about.
    fn persist_years(&self, years: &[i32]) -> StoreResult<()>;

    /// The year set last written with [`persist_years`](Self::persist_years).
    fn load_years(&self) -> StoreResult<Vec<i32>>;
}

/// Encode a partition as a versioned snapshot.
pub(crate) fn encode_partition(partition: &YearPartition) -> StoreResult<Vec<u8>> {
    bincode::serialize(&partition.snapshot()).map_err(|e| StoreError::Serialization {
        message: format!("failed to encode partition {}: {e}", partition.year()),
    })
}

/// Decode a snapshot written by [`encode_partition`] and rebuild its views.
pub(crate) fn decode_partition(year: i32, bytes: &[u8]) -> StoreResult<YearPartition> {
    let snapshot: Snapshot = bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode partition {year}: {e}"),
    })?;
    if snapshot.format_version != SNAPSHOT_VERSION {
        return Err(StoreError::Serialization {
            message: format!(
                "partition {year} has format version {}, expected {SNAPSHOT_VERSION}",
                snapshot.format_version
            ),
        });
    }
    if snapshot.year != year {
        return Err(StoreError::Serialization {
            message: format!("partition stored under {year} holds year {}", snapshot.year),
        });
    }
    Ok(YearPartition::from_purchases(year, snapshot.purchases))
}

pub(crate) fn encode_years(years: &[i32]) -> StoreResult<Vec<u8>> {
    bincode::serialize(years).map_err(|e| StoreError::Serialization {
        message: format!("failed to encode year index: {e}"),
    })
}

pub(crate) fn decode_years(bytes: &[u8]) -> StoreResult<Vec<i32>> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode year index: {e}"),
    })
}

//! ACID-durable partition store backed by redb.
//!
//! Partitions live in their own table keyed by year; the year index is a
//! single entry in the metadata table. Each write is one transaction.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition, TableError};

use crate::error::StoreError;
use crate::partition::YearPartition;
use crate::store::{
    PartitionStore, StoreResult, decode_partition, decode_years, encode_partition, encode_years,
};

/// Encoded partitions, keyed by year.
const PARTITIONS_TABLE: TableDefinition<i32, &[u8]> = TableDefinition::new("partitions");

/// Ledger metadata (the year index).
const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const YEARS_KEY: &str = "years";

/// Database file created inside the data directory.
pub const DB_FILE: &str = "ledger.redb";

/// Partition store using redb.
///
/// All writes go through transactions. Reads use MVCC snapshots.
pub struct DurableStore {
    db: Arc<Database>,
}

fn redb_err(context: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Redb {
        message: format!("{context} failed: {e}"),
    }
}

impl DurableStore {
    /// Open or create a durable store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join(DB_FILE);
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        tracing::debug!(path = %db_path.display(), "opened partition store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl PartitionStore for DurableStore {
    fn persist_partition(&self, year: i32, partition: &YearPartition) -> StoreResult<()> {
        let bytes = encode_partition(partition)?;
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn
                .open_table(PARTITIONS_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            table
                .insert(year, bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))?;
        tracing::debug!(year, bytes = bytes.len(), "persisted partition");
        Ok(())
    }

    fn reload_partition(&self, year: i32) -> StoreResult<YearPartition> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = match txn.open_table(PARTITIONS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => {
                return Err(StoreError::PartitionMissing { year });
            }
            Err(e) => return Err(redb_err("open_table", e)),
        };
        let bytes = table
            .get(year)
            .map_err(|e| redb_err("get", e))?
            .map(|guard| guard.value().to_vec())
            .ok_or(StoreError::PartitionMissing { year })?;
        decode_partition(year, &bytes)
    }

    fn persist_years(&self, years: &[i32]) -> StoreResult<()> {
        let bytes = encode_years(years)?;
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn
                .open_table(META_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            table
                .insert(YEARS_KEY, bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))?;
        Ok(())
    }

    fn load_years(&self) -> StoreResult<Vec<i32>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = match txn.open_table(META_TABLE) {
            Ok(table) => table,
            // Nothing has been written yet.
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(redb_err("open_table", e)),
        };
        match table.get(YEARS_KEY).map_err(|e| redb_err("get", e))? {
            Some(guard) => decode_years(guard.value()),
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}

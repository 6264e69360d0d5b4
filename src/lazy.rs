//! Lazily loaded, evictable partition cells.
//!
//! A [`LazyPartitionRef`] owns at most one in-memory [`YearPartition`] and
//! knows whether that content has reached the durable store. It cycles
//! between three states:
//!
//! ```text
//!   Absent ──(set)──▶ Resident ──(clear, if stored and clean)──▶ Evicted
//!                        ▲                                         │
//!                        └──────────────(get / reload)─────────────┘
//! ```
//!
//! Eviction never discards content that is not durable: clearing a partition
//! that was never persisted, or was mutated since its last persist, is a no-op.

use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::partition::YearPartition;
use crate::store::{PartitionStore, StoreResult};

/// Observable state of a [`LazyPartitionRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionState {
    Absent,
    Resident,
    Evicted,
}

impl fmt::Display for PartitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionState::Absent => write!(f, "absent"),
            PartitionState::Resident => write!(f, "resident"),
            PartitionState::Evicted => write!(f, "evicted"),
        }
    }
}

enum Slot {
    Absent,
    /// `dirty` is set by mutation and cleared by a completed persist.
    Resident { partition: YearPartition, dirty: bool },
    Evicted,
}

/// Cache cell for one year's partition.
pub struct LazyPartitionRef {
    year: i32,
    slot: RwLock<Slot>,
    stored: AtomicBool,
}

impl fmt::Debug for LazyPartitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPartitionRef")
            .field("year", &self.year)
            .field("state", &self.state())
            .field("stored", &self.is_stored())
            .finish()
    }
}

impl LazyPartitionRef {
    /// A cell with no content yet.
    pub fn absent(year: i32) -> Self {
        Self {
            year,
            slot: RwLock::new(Slot::Absent),
            stored: AtomicBool::new(false),
        }
    }

    /// A cell holding fresh, not yet persisted content.
    pub fn resident(partition: YearPartition) -> Self {
        Self {
            year: partition.year(),
            slot: RwLock::new(Slot::Resident {
                partition,
                dirty: true,
            }),
            stored: AtomicBool::new(false),
        }
    }

    /// A cell whose content already lives only in the durable store.
    pub fn evicted(year: i32) -> Self {
        Self {
            year,
            slot: RwLock::new(Slot::Evicted),
            stored: AtomicBool::new(true),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn state(&self) -> PartitionState {
        match &*self.slot.read().expect("partition slot poisoned") {
            Slot::Absent => PartitionState::Absent,
            Slot::Resident { .. } => PartitionState::Resident,
            Slot::Evicted => PartitionState::Evicted,
        }
    }

    /// True once at least one durable write of this cell has completed.
    pub fn is_stored(&self) -> bool {
        self.stored.load(Ordering::Acquire)
    }

    /// Purchases held in memory, or `None` unless resident.
    pub fn resident_len(&self) -> Option<usize> {
        match &*self.slot.read().expect("partition slot poisoned") {
            Slot::Resident { partition, .. } => Some(partition.len()),
            _ => None,
        }
    }

    /// Run `f` over the partition, reloading it from `store` if evicted.
    ///
    /// `f` receives `None` when the cell is absent. It always runs under a
    /// read guard, so a panic in `f` cannot poison the cell. Reload failures
    /// are returned unchanged and leave the cell evicted.
    pub fn get<R>(
        &self,
        store: &dyn PartitionStore,
        f: impl FnOnce(Option<&YearPartition>) -> R,
    ) -> StoreResult<R> {
        loop {
            {
                let slot = self.slot.read().expect("partition slot poisoned");
                match &*slot {
                    Slot::Resident { partition, .. } => return Ok(f(Some(partition))),
                    Slot::Absent => return Ok(f(None)),
                    Slot::Evicted => {}
                }
            }
            self.reload(store)?;
        }
    }

    /// Bring evicted content back into memory. Another thread may have
    /// reloaded it first, in which case this does nothing.
    fn reload(&self, store: &dyn PartitionStore) -> StoreResult<()> {
        let mut slot = self.slot.write().expect("partition slot poisoned");
        if let Slot::Evicted = *slot {
            let partition = store.reload_partition(self.year)?;
            tracing::debug!(year = self.year, purchases = partition.len(), "reloaded partition");
            *slot = Slot::Resident {
                partition,
                dirty: false,
            };
        }
        Ok(())
    }

    /// Mutate the partition in place, reloading it first if evicted.
    ///
    /// An absent cell gets an empty partition for its year. The cell is
    /// marked dirty until the next [`persist`](Self::persist).
    pub fn update<R>(
        &self,
        store: &dyn PartitionStore,
        f: impl FnOnce(&mut YearPartition) -> R,
    ) -> StoreResult<R> {
        let mut slot = self.slot.write().expect("partition slot poisoned");
        let partition = match std::mem::replace(&mut *slot, Slot::Absent) {
            Slot::Resident { partition, .. } => partition,
            Slot::Absent => YearPartition::new(self.year),
            Slot::Evicted => match store.reload_partition(self.year) {
                Ok(partition) => partition,
                Err(e) => {
                    *slot = Slot::Evicted;
                    return Err(e);
                }
            },
        };
        *slot = Slot::Resident {
            partition,
            dirty: true,
        };
        let Slot::Resident { partition, .. } = &mut *slot else {
            unreachable!("slot was just made resident");
        };
        Ok(f(partition))
    }

    /// Replace the content with a fresh partition, marked dirty.
    pub fn set(&self, partition: YearPartition) {
        let mut slot = self.slot.write().expect("partition slot poisoned");
        *slot = Slot::Resident {
            partition,
            dirty: true,
        };
    }

    /// Write resident content to `store` and mark the cell clean and stored.
    ///
    /// Absent and evicted cells have nothing newer than the store; this is a
    /// no-op for them.
    pub fn persist(&self, store: &dyn PartitionStore) -> StoreResult<()> {
        let mut slot = self.slot.write().expect("partition slot poisoned");
        if let Slot::Resident { partition, dirty } = &mut *slot {
            store.persist_partition(self.year, partition)?;
            *dirty = false;
            self.stored.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Release the in-memory partition and return it.
    ///
    /// Only content that is fully durable can be evicted. Otherwise the cell
    /// is left untouched and `None` is returned.
    pub fn clear(&self) -> Option<YearPartition> {
        let mut slot = self.slot.write().expect("partition slot poisoned");
        match &*slot {
            Slot::Resident { dirty: false, .. } if self.is_stored() => {}
            Slot::Resident { .. } => {
                tracing::warn!(year = self.year, "refusing to evict unsaved partition");
                return None;
            }
            Slot::Absent | Slot::Evicted => return None,
        }
        match std::mem::replace(&mut *slot, Slot::Evicted) {
            Slot::Resident { partition, .. } => Some(partition),
            _ => None,
        }
    }
}

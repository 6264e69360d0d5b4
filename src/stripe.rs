//! Striped reader/writer locks.
//!
//! A fixed pool of `RwLock`s, each key routed to one stripe by a stable hash.
//! Keys on different stripes never contend; keys sharing a stripe follow
//! ordinary reader/writer semantics. Every operation holds exactly one stripe,
//! so there is no lock ordering to get wrong.

use std::hash::{BuildHasher, BuildHasherDefault, DefaultHasher, Hash};
use std::sync::{OnceLock, PoisonError, RwLock};

/// A fixed-size pool of lazily allocated reader/writer locks.
pub struct StripedLock {
    stripes: Box<[OnceLock<RwLock<()>>]>,
    hasher: BuildHasherDefault<DefaultHasher>,
}

impl std::fmt::Debug for StripedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let allocated = self.stripes.iter().filter(|s| s.get().is_some()).count();
        f.debug_struct("StripedLock")
            .field("stripes", &self.stripes.len())
            .field("allocated", &allocated)
            .finish()
    }
}

impl StripedLock {
    pub const DEFAULT_STRIPES: usize = 8;

    /// Create a pool with `stripes` locks (at least one).
    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| OnceLock::new()).collect(),
            hasher: BuildHasherDefault::default(),
        }
    }

    /// Number of stripes in the pool.
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Index of the stripe guarding `key`.
    pub fn stripe_of<K: Hash + ?Sized>(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.stripes.len() as u64) as usize
    }

    fn lock_for<K: Hash + ?Sized>(&self, key: &K) -> &RwLock<()> {
        self.stripes[self.stripe_of(key)].get_or_init(|| RwLock::new(()))
    }

    /// Run `f` holding the shared lock of `key`'s stripe.
    pub fn read<K: Hash + ?Sized, R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        // The stripes guard `()`, so a poisoned stripe carries no broken state.
        let _guard = self
            .lock_for(key)
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Run `f` holding the exclusive lock of `key`'s stripe.
    pub fn write<K: Hash + ?Sized, R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let _guard = self
            .lock_for(key)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

impl Default for StripedLock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRIPES)
    }
}

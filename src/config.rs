//! Ledger configuration.
//!
//! Loaded from and saved to TOML:
//!
//! ```toml
//! data_dir = "/var/lib/bookstore"
//! stripes = 8
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LedgerResult};
use crate::ledger::PurchaseLedger;
use crate::store::{DurableStore, MemStore, PartitionStore};
use crate::stripe::StripedLock;

/// Configuration for a [`PurchaseLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory for the durable store. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Number of lock stripes shared by all years.
    pub stripes: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            stripes: StripedLock::DEFAULT_STRIPES,
        }
    }
}

impl LedgerConfig {
    /// A config persisting under `dir`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stripes == 0 {
            return Err(ConfigError::InvalidStripes);
        }
        Ok(())
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// The store this config points at: redb under `data_dir`, or memory.
    pub fn open_store(&self) -> LedgerResult<Arc<dyn PartitionStore>> {
        let store: Arc<dyn PartitionStore> = match &self.data_dir {
            Some(dir) => Arc::new(DurableStore::open(dir)?),
            None => Arc::new(MemStore::new()),
        };
        Ok(store)
    }

    /// Validate, open the store and load the ledger's year index.
    pub fn open_ledger(&self) -> LedgerResult<PurchaseLedger> {
        self.validate()?;
        let store = self.open_store()?;
        Ok(PurchaseLedger::open(store, self)?)
    }
}

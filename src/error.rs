//! Rich diagnostic error types for the purchase ledger.
//!
//! Each concern defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ledger.
///
/// Each variant wraps a concern-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum LedgerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(ledger::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(ledger::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption; try opening a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(ledger::store::serde),
        help(
            "Failed to encode or decode a partition snapshot. \
             This usually means the stored format changed between versions. \
             Re-run the historical load for the affected years."
        )
    )]
    Serialization { message: String },

    #[error("no stored partition for year {year}")]
    #[diagnostic(
        code(ledger::store::partition_missing),
        help(
            "The ledger tried to reload a year that was never persisted. \
             The year index and the partition table are out of sync; \
             re-run the historical load for this year."
        )
    )]
    PartitionMissing { year: i32 },
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error("a purchase needs at least one item")]
    #[diagnostic(
        code(ledger::validation::empty_purchase),
        help("Build the purchase with one or more items.")
    )]
    EmptyPurchase,

    #[error("item for book {book} has amount 0")]
    #[diagnostic(
        code(ledger::validation::zero_amount),
        help("Item amounts must be positive.")
    )]
    ZeroAmount { book: u32 },

    #[error("purchase from {actual} cannot be loaded into year {expected}")]
    #[diagnostic(
        code(ledger::validation::year_mismatch),
        help("A historical load only accepts purchases from its own year.")
    )]
    YearMismatch { expected: i32, actual: i32 },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    #[diagnostic(
        code(ledger::config::read),
        help("Check that the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}")]
    #[diagnostic(
        code(ledger::config::write),
        help("Check that the parent directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    #[diagnostic(
        code(ledger::config::parse),
        help("The file must be valid TOML with `data_dir` and `stripes` keys.")
    )]
    Parse { path: String, message: String },

    #[error("failed to serialize config for {path}: {message}")]
    #[diagnostic(
        code(ledger::config::serialize),
        help("Every config value must be representable in TOML; `data_dir` must be valid UTF-8.")
    )]
    Serialize { path: String, message: String },

    #[error("stripe count must be at least 1")]
    #[diagnostic(
        code(ledger::config::stripes),
        help("Set `stripes` to a small positive number; 4 to 16 works well.")
    )]
    InvalidStripes,
}

/// Convenience alias for functions returning ledger results.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

//! Ledger Store: the persisted mapping of account identifier to balance.
//!
//! The store exposes exactly the primitives the transfer strategies are
//! allowed to build on:
//!
//! - `read_balance(account)` on a plain connection (autocommit read)
//! - `conditional_decrement(account, amount)`: atomic compare-and-decrement
//! - `decrement` / `increment`: unconditional writes
//! - `begin` (deferred or immediate), `commit`, `rollback`
//!
//! ## Error Mapping
//!
//! | SQLx Error | LedgerStoreError |
//! |------------|------------------|
//! | PoolTimedOut | `PoolTimedOut` |
//! | PoolClosed | `PoolClosed` |
//! | anything else | `Database` (with the failing operation) |

pub mod sqlite;

pub use sqlite::{LedgerConnection, LedgerTransaction, SqliteLedger, TransactionMode};

use thiserror::Error;

/// Storage-layer failure. Always surfaced to callers as a server error.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("timed out waiting for a storage connection in {0}")]
    PoolTimedOut(&'static str),

    #[error("storage connection pool closed in {0}")]
    PoolClosed(&'static str),

    #[error("failed to prepare database file: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> LedgerStoreError {
    match err {
        sqlx::Error::PoolTimedOut => LedgerStoreError::PoolTimedOut(operation),
        sqlx::Error::PoolClosed => LedgerStoreError::PoolClosed(operation),
        other => LedgerStoreError::Database {
            operation,
            source: other,
        },
    }
}

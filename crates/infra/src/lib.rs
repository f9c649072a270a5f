//! Infrastructure layer: ledger storage, transfer strategies, balance reporting, config.

pub mod config;
pub mod executor;
pub mod ledger_store;
pub mod observer;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, LedgerConfig};
pub use executor::{TransferError, TransferExecutor};
pub use ledger_store::{LedgerStoreError, SqliteLedger};
pub use observer::BalanceObserver;

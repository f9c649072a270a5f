//! Shared fixtures for storage-backed tests: one temporary database per test.

use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use tempfile::TempDir;

use racebank_core::{AccountId, Amount, TransferIntent, TransferMode};

use crate::config::LedgerConfig;
use crate::ledger_store::SqliteLedger;

pub(crate) struct TestLedger {
    pub ledger: SqliteLedger,
    pub config: LedgerConfig,
    // Keeps the database directory alive for the duration of the test.
    _dir: TempDir,
}

impl TestLedger {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_busy_timeout(timeout: Duration) -> Self {
        Self::with_config(|c| c.busy_timeout = timeout).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut LedgerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LedgerConfig::at(dir.path().join("ledger.sqlite3"));
        customize(&mut config);
        let ledger = SqliteLedger::open(&config).await.unwrap();
        Self {
            ledger,
            config,
            _dir: dir,
        }
    }

    /// Run raw SQL against the database file on a side connection, outside
    /// the ledger's pool.
    pub async fn execute_script(&self, script: &str) {
        let options = SqliteConnectOptions::new().filename(&self.config.database_path);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::raw_sql(script).execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();
    }
}

pub(crate) fn account(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

pub(crate) fn amount(value: i64) -> Amount {
    Amount::new(value).unwrap()
}

pub(crate) fn intent(from: &str, to: &str, value: i64, mode: TransferMode) -> TransferIntent {
    TransferIntent::new(account(from), account(to), amount(value), mode)
}

//! SQLite-backed ledger store.
//!
//! The database runs in WAL journal mode: readers (the balance observer) never
//! wait on a writer, and at most one write transaction holds the ledger's write
//! lock at any time. Writers that find the lock taken wait up to the configured
//! busy timeout before failing.
//!
//! ## Thread Safety
//!
//! `SqliteLedger` is cheap to clone and `Send + Sync`; every operation checks a
//! connection out of the shared pool. Balances are never cached in-process.

use std::path::Path;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, info, instrument, warn};

use racebank_core::{AccountBalance, AccountId, Amount, BalanceSnapshot};

use super::{map_sqlx_error, LedgerStoreError};
use crate::config::LedgerConfig;

const CREATE_ACCOUNTS: &str = r#"
    CREATE TABLE IF NOT EXISTS accounts (
        username TEXT PRIMARY KEY,
        balance  INTEGER NOT NULL
    )
"#;

/// Handle to the shared ledger database.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (and when configured, reset) the ledger, create the schema and
    /// seed the configured accounts.
    ///
    /// Seeding never overwrites an account that already exists.
    #[instrument(skip(config), fields(path = %config.database_path.display()))]
    pub async fn open(config: &LedgerConfig) -> Result<Self, LedgerStoreError> {
        if config.reset_on_start {
            remove_database_files(&config.database_path)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("open", e))?;

        let ledger = Self { pool };
        ledger.provision(&config.seed_accounts).await?;
        info!(accounts = config.seed_accounts.len(), "ledger ready");
        Ok(ledger)
    }

    async fn provision(&self, seed: &[(AccountId, i64)]) -> Result<(), LedgerStoreError> {
        sqlx::query(CREATE_ACCOUNTS)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_schema", e))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("seed", e))?;
        for (account, balance) in seed {
            sqlx::query("INSERT OR IGNORE INTO accounts (username, balance) VALUES (?1, ?2)")
                .bind(account.as_str())
                .bind(*balance)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("seed", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("seed", e))?;
        Ok(())
    }

    /// Check out a dedicated connection (no transaction open).
    pub async fn acquire(&self) -> Result<LedgerConnection, LedgerStoreError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        Ok(LedgerConnection { conn })
    }

    /// Begin a transaction that holds the ledger write lock from its first
    /// statement until commit or rollback.
    pub async fn begin_exclusive(&self) -> Result<LedgerTransaction, LedgerStoreError> {
        self.acquire().await?.begin(TransactionMode::Immediate).await
    }

    /// Autocommit read of a single balance.
    pub async fn read_balance(&self, account: &AccountId) -> Result<Option<i64>, LedgerStoreError> {
        self.acquire().await?.read_balance(account).await
    }

    /// All accounts ordered by identifier, read outside any transfer transaction.
    pub async fn snapshot(&self) -> Result<BalanceSnapshot, LedgerStoreError> {
        let rows = sqlx::query("SELECT username, balance FROM accounts ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("snapshot", e))?;

        let mut balances = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for row in rows {
            let username: String = row
                .try_get("username")
                .map_err(|e| map_sqlx_error("snapshot", e))?;
            let balance: i64 = row
                .try_get("balance")
                .map_err(|e| map_sqlx_error("snapshot", e))?;
            match AccountId::new(username) {
                Ok(account) => balances.push(AccountBalance { account, balance }),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, balance, "snapshot skipped account row");
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, "snapshot total excludes rows without a valid account identifier");
        }
        Ok(BalanceSnapshot::new(balances))
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn remove_database_files(path: &Path) -> Result<(), LedgerStoreError> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        candidates.push(side.into());
    }

    for candidate in candidates {
        match std::fs::remove_file(&candidate) {
            Ok(()) => debug!(file = %candidate.display(), "removed existing database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// How a transaction acquires the write lock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransactionMode {
    /// Lock taken by the first write statement.
    Deferred,
    /// Lock taken at `BEGIN`, before any statement runs.
    Immediate,
}

impl TransactionMode {
    fn begin_statement(self) -> &'static str {
        match self {
            TransactionMode::Deferred => "BEGIN DEFERRED",
            TransactionMode::Immediate => "BEGIN IMMEDIATE",
        }
    }
}

/// A pooled connection with no open transaction.
#[derive(Debug)]
pub struct LedgerConnection {
    conn: PoolConnection<Sqlite>,
}

impl LedgerConnection {
    /// Current balance of `account`, or `None` if the account does not exist.
    pub async fn read_balance(&mut self, account: &AccountId) -> Result<Option<i64>, LedgerStoreError> {
        // Drain to completion so the statement releases its read snapshot.
        let balances: Vec<i64> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE username = ?1")
                .bind(account.as_str())
                .fetch_all(&mut *self.conn)
                .await
                .map_err(|e| map_sqlx_error("read_balance", e))?;
        Ok(balances.into_iter().next())
    }

    /// Open a transaction on this connection.
    pub async fn begin(mut self, mode: TransactionMode) -> Result<LedgerTransaction, LedgerStoreError> {
        sqlx::query(mode.begin_statement())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(LedgerTransaction {
            conn: self.conn,
            mode,
            open: true,
        })
    }
}

/// An open transaction on a dedicated connection.
///
/// Dropping it while still open closes the underlying connection instead of
/// returning it to the pool, which makes SQLite discard the transaction.
#[derive(Debug)]
pub struct LedgerTransaction {
    conn: PoolConnection<Sqlite>,
    mode: TransactionMode,
    open: bool,
}

impl LedgerTransaction {
    /// Debit `amount` only if the current balance covers it, as one statement.
    ///
    /// Returns the number of rows modified: 0 when the account is missing or
    /// its balance is below `amount`.
    pub async fn conditional_decrement(
        &mut self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<u64, LedgerStoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET balance = balance - ?1 WHERE username = ?2 AND balance >= ?1",
        )
        .bind(amount.get())
        .bind(account.as_str())
        .execute(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("conditional_decrement", e))?;
        Ok(result.rows_affected())
    }

    /// Debit `amount` with no balance check. Returns the rows modified.
    pub async fn decrement(&mut self, account: &AccountId, amount: Amount) -> Result<u64, LedgerStoreError> {
        let result = sqlx::query("UPDATE accounts SET balance = balance - ?1 WHERE username = ?2")
            .bind(amount.get())
            .bind(account.as_str())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("decrement", e))?;
        Ok(result.rows_affected())
    }

    /// Credit `amount`. Returns the rows modified (0 if the account is missing).
    pub async fn increment(&mut self, account: &AccountId, amount: Amount) -> Result<u64, LedgerStoreError> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + ?1 WHERE username = ?2")
            .bind(amount.get())
            .bind(account.as_str())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("increment", e))?;
        Ok(result.rows_affected())
    }

    pub async fn commit(&mut self) -> Result<(), LedgerStoreError> {
        sqlx::query("COMMIT")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        self.open = false;
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<(), LedgerStoreError> {
        sqlx::query("ROLLBACK")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("rollback", e))?;
        self.open = false;
        Ok(())
    }

    /// Best-effort rollback; a failure is logged and otherwise ignored.
    pub async fn rollback_quietly(&mut self) {
        if let Err(e) = self.rollback().await {
            debug!(error = %e, "rollback failed; connection will be discarded");
        }
    }
}

impl Drop for LedgerTransaction {
    fn drop(&mut self) {
        if self.open {
            warn!(mode = ?self.mode, "transaction dropped while open; closing connection");
            self.conn.close_on_drop();
        }
    }
}

//! Ledger configuration loading and representation.
//!
//! Values come from `RACEBANK_*` environment variables. Parsing goes through a
//! lookup function so callers (and tests) can supply any key/value source.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use racebank_core::AccountId;

pub const ENV_DB_PATH: &str = "RACEBANK_DB_PATH";
pub const ENV_RESET_DB: &str = "RACEBANK_RESET_DB";
pub const ENV_SEED: &str = "RACEBANK_SEED";
pub const ENV_MAX_CONNECTIONS: &str = "RACEBANK_MAX_CONNECTIONS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "RACEBANK_BUSY_TIMEOUT_MS";
pub const ENV_INSECURE_WINDOW_MS: &str = "RACEBANK_INSECURE_WINDOW_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// How the ledger database is opened, seeded and accessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Delete the file (and its WAL side files) before opening, then re-seed.
    pub reset_on_start: bool,
    /// Accounts created when the ledger is provisioned.
    pub seed_accounts: Vec<(AccountId, i64)>,
    /// Upper bound on concurrently open storage connections.
    pub max_connections: u32,
    /// How long a writer waits for the ledger write lock before failing.
    pub busy_timeout: Duration,
    /// Pause between the insecure strategy's balance check and its writes.
    pub insecure_window: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("db.sqlite3"),
            reset_on_start: true,
            seed_accounts: default_seed(),
            max_connections: 32,
            busy_timeout: Duration::from_millis(5_000),
            insecure_window: Duration::ZERO,
        }
    }
}

fn default_seed() -> Vec<(AccountId, i64)> {
    ["alice", "bob"]
        .into_iter()
        .filter_map(|name| AccountId::new(name).ok())
        .map(|id| (id, 100))
        .collect()
}

impl LedgerConfig {
    /// Default configuration for a database at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key/value source; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH) {
            if path.trim().is_empty() {
                return Err(ConfigError::invalid(ENV_DB_PATH, "must not be empty"));
            }
            config.database_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_RESET_DB) {
            config.reset_on_start = parse_bool(ENV_RESET_DB, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SEED) {
            config.seed_accounts = parse_seed(&raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            let n: u32 = parse_number(ENV_MAX_CONNECTIONS, &raw)?;
            if n == 0 {
                return Err(ConfigError::invalid(ENV_MAX_CONNECTIONS, "must be at least 1"));
            }
            config.max_connections = n;
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout = Duration::from_millis(parse_number(ENV_BUSY_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_INSECURE_WINDOW_MS) {
            config.insecure_window =
                Duration::from_millis(parse_number(ENV_INSECURE_WINDOW_MS, &raw)?);
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("expected a boolean, got '{other}'"))),
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}")))
}

/// Parse `alice=100,bob=100`.
fn parse_seed(raw: &str) -> Result<Vec<(AccountId, i64)>, ConfigError> {
    let mut accounts: Vec<(AccountId, i64)> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, balance) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::invalid(ENV_SEED, format!("'{entry}' is not name=balance")))?;
        let account = AccountId::new(name.trim())
            .map_err(|e| ConfigError::invalid(ENV_SEED, e.to_string()))?;
        let balance: i64 = parse_number(ENV_SEED, balance)?;
        if accounts.iter().any(|(existing, _)| existing == &account) {
            return Err(ConfigError::invalid(ENV_SEED, format!("duplicate account '{account}'")));
        }
        accounts.push((account, balance));
    }
    Ok(accounts)
}

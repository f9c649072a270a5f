//! Server configuration (listener + ledger), loaded from the environment.

use std::net::SocketAddr;

use racebank_infra::{ConfigError, LedgerConfig};

pub const ENV_BIND_ADDR: &str = "RACEBANK_BIND_ADDR";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub ledger: LedgerConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(ENV_BIND_ADDR, format!("'{raw}': {e}")))?;

        Ok(Self {
            bind_addr,
            ledger: LedgerConfig::from_lookup(lookup)?,
        })
    }
}

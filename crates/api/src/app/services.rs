//! Service wiring: one ledger shared by the executor and the observer.

use racebank_infra::{BalanceObserver, LedgerConfig, LedgerStoreError, SqliteLedger, TransferExecutor};

#[derive(Debug, Clone)]
pub struct AppServices {
    executor: TransferExecutor,
    observer: BalanceObserver,
}

impl AppServices {
    pub fn new(executor: TransferExecutor, observer: BalanceObserver) -> Self {
        Self { executor, observer }
    }

    pub fn executor(&self) -> &TransferExecutor {
        &self.executor
    }

    pub fn observer(&self) -> &BalanceObserver {
        &self.observer
    }

    pub fn ledger(&self) -> &SqliteLedger {
        self.executor.ledger()
    }
}

/// Open (and provision) the ledger described by `config` and wire services on it.
pub async fn build_services(config: &LedgerConfig) -> Result<AppServices, LedgerStoreError> {
    let ledger = SqliteLedger::open(config).await?;
    let executor = TransferExecutor::new(ledger.clone()).with_insecure_window(config.insecure_window);
    let observer = BalanceObserver::new(ledger);
    Ok(AppServices::new(executor, observer))
}

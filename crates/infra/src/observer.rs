//! Balance Observer: diagnostic view of the whole ledger.
//!
//! Reads on its own pooled connection and never joins a transfer's
//! transaction. A failed read is logged; it never changes a request outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

use racebank_core::BalanceSnapshot;

use crate::ledger_store::{LedgerStoreError, SqliteLedger};

/// Clones share one report sequence.
#[derive(Debug, Clone)]
pub struct BalanceObserver {
    ledger: SqliteLedger,
    reports: Arc<AtomicU64>,
}

impl BalanceObserver {
    pub fn new(ledger: SqliteLedger) -> Self {
        Self {
            ledger,
            reports: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of reports started so far, including ones whose read failed.
    pub fn reports_issued(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    /// All accounts ordered by identifier.
    pub async fn snapshot(&self) -> Result<BalanceSnapshot, LedgerStoreError> {
        self.ledger.snapshot().await
    }

    /// Log one `Balances: alice=100, bob=100` line. Returns the snapshot when
    /// the read succeeded.
    pub async fn report(&self) -> Option<BalanceSnapshot> {
        let seq = self.reports.fetch_add(1, Ordering::Relaxed) + 1;
        match self.snapshot().await {
            Ok(snapshot) => {
                info!(report = seq, total = %snapshot.total(), "Balances: {snapshot}");
                Some(snapshot)
            }
            Err(e) => {
                warn!(report = seq, error = %e, "failed to read balances");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestLedger;

    #[tokio::test]
    async fn report_returns_current_snapshot() {
        let t = TestLedger::new().await;
        let observer = BalanceObserver::new(t.ledger.clone());

        let snapshot = observer.report().await.unwrap();
        assert_eq!(snapshot.to_string(), "alice=100, bob=100");
        assert_eq!(observer.reports_issued(), 1);
    }

    #[tokio::test]
    async fn clones_share_the_report_sequence() {
        let t = TestLedger::new().await;
        let observer = BalanceObserver::new(t.ledger.clone());
        let clone = observer.clone();

        observer.report().await;
        clone.report().await;
        assert_eq!(observer.reports_issued(), 2);
        assert_eq!(clone.reports_issued(), 2);
    }

    #[tokio::test]
    async fn report_swallows_storage_failure() {
        let t = TestLedger::new().await;
        let observer = BalanceObserver::new(t.ledger.clone());
        t.ledger.close().await;

        assert!(observer.report().await.is_none());
        assert_eq!(observer.reports_issued(), 1);
        assert!(matches!(
            observer.snapshot().await,
            Err(LedgerStoreError::PoolClosed("snapshot"))
        ));
    }
}

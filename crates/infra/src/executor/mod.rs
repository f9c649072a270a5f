//! Transfer Executor: applies a [`TransferIntent`] against the ledger using the
//! strategy its mode selects.
//!
//! ```text
//! TransferIntent { mode: Secure }   -> secure::transfer   (BEGIN IMMEDIATE, conditional debit, credit, COMMIT)
//! TransferIntent { mode: Insecure } -> insecure::transfer (read, check, BEGIN, debit, credit, COMMIT)
//! ```
//!
//! The executor holds no balances between calls; every transfer re-reads or
//! re-validates against the store.

mod insecure;
mod secure;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use racebank_core::{AccountId, TransferIntent, TransferMode, TransferReceipt};

use crate::ledger_store::{LedgerStoreError, SqliteLedger};

#[derive(Debug, Error)]
pub enum TransferError {
    /// The source is missing or could not cover the amount when checked
    /// (the secure strategy also lands here for a missing target).
    /// Nothing was written.
    #[error("insufficient funds or missing account ({from} -> {to})")]
    InsufficientFundsOrMissingAccount { from: AccountId, to: AccountId },

    /// Unexpected storage failure. Any started transaction was rolled back.
    #[error(transparent)]
    Storage(#[from] LedgerStoreError),
}

impl TransferError {
    fn rejected(intent: &TransferIntent) -> Self {
        TransferError::InsufficientFundsOrMissingAccount {
            from: intent.source.clone(),
            to: intent.target.clone(),
        }
    }
}

/// Executes transfers against a shared ledger.
#[derive(Debug, Clone)]
pub struct TransferExecutor {
    ledger: SqliteLedger,
    insecure_window: Duration,
}

impl TransferExecutor {
    pub fn new(ledger: SqliteLedger) -> Self {
        Self {
            ledger,
            insecure_window: Duration::ZERO,
        }
    }

    /// Pause the insecure strategy for `window` between its check and its writes.
    pub fn with_insecure_window(mut self, window: Duration) -> Self {
        self.insecure_window = window;
        self
    }

    pub fn ledger(&self) -> &SqliteLedger {
        &self.ledger
    }

    /// Run the transfer with the strategy named by `intent.mode`.
    ///
    /// No retries: a failed transfer is reported once.
    #[instrument(
        skip(self, intent),
        fields(
            mode = %intent.mode,
            from = %intent.source,
            to = %intent.target,
            amount = %intent.amount
        )
    )]
    pub async fn execute(&self, intent: &TransferIntent) -> Result<TransferReceipt, TransferError> {
        let outcome = match intent.mode {
            TransferMode::Secure => secure::transfer(&self.ledger, intent).await,
            TransferMode::Insecure => {
                insecure::transfer(&self.ledger, intent, self.insecure_window).await
            }
        };

        match outcome {
            Ok(()) => {
                debug!("transfer committed");
                Ok(intent.receipt())
            }
            Err(e @ TransferError::InsufficientFundsOrMissingAccount { .. }) => {
                debug!("transfer rejected");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "transfer failed in storage");
                Err(e)
            }
        }
    }
}

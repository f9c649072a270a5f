//! Secure strategy: the balance check is the debit.
//!
//! 1. `BEGIN IMMEDIATE` takes the ledger write lock before anything is read.
//! 2. One conditional update debits the source only if `balance >= amount`.
//! 3. Zero rows modified: roll back, reject.
//! 4. Credit the target in the same transaction (must hit exactly one row).
//! 5. Commit. A failed commit is followed by a best-effort rollback whose own
//!    failure is swallowed; the caller still sees the storage error.
//!
//! Concurrent transfers from the same source serialize on the write lock and
//! each one observes the balance left by the previous commit.

use racebank_core::TransferIntent;

use super::TransferError;
use crate::ledger_store::{LedgerStoreError, LedgerTransaction, SqliteLedger};

pub(super) async fn transfer(ledger: &SqliteLedger, intent: &TransferIntent) -> Result<(), TransferError> {
    let mut tx = ledger.begin_exclusive().await?;

    match debit_then_credit(&mut tx, intent).await {
        Ok(true) => {}
        Ok(false) => {
            tx.rollback().await?;
            return Err(TransferError::rejected(intent));
        }
        Err(e) => {
            tx.rollback_quietly().await;
            return Err(e.into());
        }
    }

    if let Err(e) = tx.commit().await {
        tx.rollback_quietly().await;
        return Err(e.into());
    }
    Ok(())
}

/// `Ok(false)` when either side of the transfer did not match exactly one row.
async fn debit_then_credit(
    tx: &mut LedgerTransaction,
    intent: &TransferIntent,
) -> Result<bool, LedgerStoreError> {
    if tx.conditional_decrement(&intent.source, intent.amount).await? != 1 {
        return Ok(false);
    }
    Ok(tx.increment(&intent.target, intent.amount).await? == 1)
}

//! Insecure strategy: check, then write, with nothing holding the two together.
//!
//! 1. Read the source balance in its own autocommit statement.
//! 2. Missing account or `balance < amount`: reject.
//! 3. (optional pause, see `TransferExecutor::with_insecure_window`)
//! 4. `BEGIN`, debit the source unconditionally, credit the target unconditionally.
//! 5. Commit.
//!
//! The check in step 2 is never re-validated at write time. Two overlapping
//! transfers from the same source can both pass it against the same stale
//! balance and both debit, driving the balance negative. This is the defect
//! the service exists to demonstrate; do not fix it here.
//!
//! A missing target is not detected either: its credit matches no row and the
//! debited funds disappear.

use std::time::Duration;

use racebank_core::TransferIntent;

use super::TransferError;
use crate::ledger_store::{LedgerStoreError, LedgerTransaction, SqliteLedger, TransactionMode};

pub(super) async fn transfer(
    ledger: &SqliteLedger,
    intent: &TransferIntent,
    window: Duration,
) -> Result<(), TransferError> {
    let mut conn = ledger.acquire().await?;

    let covered = conn
        .read_balance(&intent.source)
        .await?
        .is_some_and(|balance| balance >= intent.amount.get());
    if !covered {
        return Err(TransferError::rejected(intent));
    }

    if !window.is_zero() {
        tokio::time::sleep(window).await;
    }

    let mut tx = conn.begin(TransactionMode::Deferred).await?;
    if let Err(e) = debit_then_credit(&mut tx, intent).await {
        tx.rollback_quietly().await;
        return Err(e.into());
    }
    if let Err(e) = tx.commit().await {
        tx.rollback_quietly().await;
        return Err(e.into());
    }
    Ok(())
}

async fn debit_then_credit(
    tx: &mut LedgerTransaction,
    intent: &TransferIntent,
) -> Result<(), LedgerStoreError> {
    tx.decrement(&intent.source, intent.amount).await?;
    tx.increment(&intent.target, intent.amount).await?;
    Ok(())
}

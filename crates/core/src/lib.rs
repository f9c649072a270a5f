//! `racebank-core`: domain building blocks for the funds-transfer service.
//!
//! This crate contains **pure domain** values (no storage or transport concerns).

pub mod account;
pub mod error;
pub mod transfer;

pub use account::{AccountBalance, AccountId, BalanceSnapshot};
pub use error::{DomainError, DomainResult};
pub use transfer::{Amount, TransferIntent, TransferMode, TransferReceipt};

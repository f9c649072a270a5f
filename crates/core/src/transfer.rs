//! Transfer intents, strategies and receipts.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::{DomainError, DomainResult};

/// Amount of money moved by a transfer, in whole units.
///
/// Always non-negative; fractional amounts do not exist in this ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 0 {
            return Err(DomainError::validation(format!(
                "amount must be non-negative, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Strategy used to apply a transfer against the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Check and debit in one conditional update inside an immediate transaction.
    Secure,
    /// Read, decide, then write in a separate transaction. Races under concurrency.
    Insecure,
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Secure => "secure",
            TransferMode::Insecure => "insecure",
        }
    }
}

impl core::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secure" => Ok(TransferMode::Secure),
            "insecure" => Ok(TransferMode::Insecure),
            other => Err(DomainError::UnknownMode(other.to_string())),
        }
    }
}

/// A request to move `amount` from `source` to `target`. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub source: AccountId,
    pub target: AccountId,
    pub amount: Amount,
    pub mode: TransferMode,
}

impl TransferIntent {
    pub fn new(source: AccountId, target: AccountId, amount: Amount, mode: TransferMode) -> Self {
        Self {
            source,
            target,
            amount,
            mode,
        }
    }

    /// Receipt describing this intent once it has been committed.
    pub fn receipt(&self) -> TransferReceipt {
        TransferReceipt {
            from: self.source.clone(),
            to: self.target.clone(),
            amount: self.amount,
            mode: self.mode,
        }
    }
}

/// Outcome of a committed transfer, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub mode: TransferMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mode_parses_known_segments_only() {
        assert_eq!("secure".parse::<TransferMode>(), Ok(TransferMode::Secure));
        assert_eq!("insecure".parse::<TransferMode>(), Ok(TransferMode::Insecure));
        assert_eq!(
            "other".parse::<TransferMode>(),
            Err(DomainError::UnknownMode("other".to_string()))
        );
        assert!("Secure".parse::<TransferMode>().is_err());
    }

    #[test]
    fn receipt_serializes_to_wire_shape() {
        let intent = TransferIntent::new(
            AccountId::new("alice").unwrap(),
            AccountId::new("bob").unwrap(),
            Amount::new(30).unwrap(),
            TransferMode::Secure,
        );

        let json = serde_json::to_value(intent.receipt()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"from": "alice", "to": "bob", "amount": 30, "mode": "secure"})
        );
    }

    #[test]
    fn negative_amount_fails_deserialization() {
        assert!(serde_json::from_str::<Amount>("-1").is_err());
        assert_eq!(serde_json::from_str::<Amount>("0").unwrap().get(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every non-negative integer is a valid amount and keeps its value.
        #[test]
        fn non_negative_values_are_amounts(value in 0i64..=i64::MAX) {
            prop_assert_eq!(Amount::new(value).unwrap().get(), value);
        }

        /// Property: no negative integer is ever accepted.
        #[test]
        fn negative_values_are_rejected(value in i64::MIN..0i64) {
            prop_assert!(matches!(Amount::new(value), Err(DomainError::Validation(_))));
        }
    }
}

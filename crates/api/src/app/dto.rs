//! Request body parsing for the transfer endpoint.

use serde::Deserialize;

use racebank_core::{AccountId, Amount};

use crate::app::errors::RequestError;

// -------------------------
// Request DTOs
// -------------------------

/// `{ "target_user": <string>, "amount": <integer> }`; unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub target_user: String,
    pub amount: AmountField,
}

/// Any JSON shape that coerces to an integer amount.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Integer(i64),
    /// Truncated toward zero.
    Float(f64),
    /// Decimal integer text, surrounding whitespace allowed.
    Text(String),
}

impl AmountField {
    pub fn coerce(&self) -> Result<i64, String> {
        match self {
            AmountField::Integer(v) => Ok(*v),
            AmountField::Float(v) => {
                let truncated = v.trunc();
                if !truncated.is_finite()
                    || truncated < i64::MIN as f64
                    || truncated >= i64::MAX as f64
                {
                    return Err(format!("amount {v} is out of range"));
                }
                Ok(truncated as i64)
            }
            AmountField::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("amount '{s}' is not an integer: {e}")),
        }
    }
}

/// Parse and validate a transfer body into its target account and amount.
///
/// Structural checks only; whether the target exists is the ledger's concern.
pub fn parse_transfer_body(body: &[u8]) -> Result<(AccountId, Amount), RequestError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| RequestError::bad_request(format!("body is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(RequestError::bad_request("body must be a JSON object"));
    }

    let request: TransferRequest = serde_json::from_value(value)
        .map_err(|e| RequestError::bad_request(format!("invalid transfer body: {e}")))?;

    let target = AccountId::new(request.target_user)
        .map_err(|e| RequestError::bad_request(e.to_string()))?;
    let amount = request
        .amount
        .coerce()
        .map_err(RequestError::bad_request)
        .and_then(|v| Amount::new(v).map_err(|e| RequestError::bad_request(e.to_string())))?;

    Ok((target, amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<(String, i64), RequestError> {
        parse_transfer_body(body.as_bytes()).map(|(t, a)| (t.to_string(), a.get()))
    }

    #[test]
    fn accepts_well_formed_body() {
        assert_eq!(
            parse(r#"{"target_user": "bob", "amount": 30}"#).unwrap(),
            ("bob".to_string(), 30)
        );
    }

    #[test]
    fn ignores_unknown_fields() {
        assert_eq!(
            parse(r#"{"target_user": "bob", "amount": 1, "memo": "rent"}"#).unwrap(),
            ("bob".to_string(), 1)
        );
    }

    #[test]
    fn coerces_integer_like_amounts() {
        assert_eq!(parse(r#"{"target_user": "bob", "amount": "30"}"#).unwrap().1, 30);
        assert_eq!(parse(r#"{"target_user": "bob", "amount": " 7 "}"#).unwrap().1, 7);
        assert_eq!(parse(r#"{"target_user": "bob", "amount": 12.9}"#).unwrap().1, 12);
    }

    #[test]
    fn rejects_structurally_invalid_bodies() {
        let cases = [
            "",
            "not json",
            r#"["bob", 30]"#,
            r#"{"amount": 30}"#,
            r#"{"target_user": "bob"}"#,
            r#"{"target_user": 5, "amount": 30}"#,
            r#"{"target_user": "bob", "amount": "thirty"}"#,
            r#"{"target_user": "bob", "amount": "3.5"}"#,
            r#"{"target_user": "bob", "amount": null}"#,
            r#"{"target_user": "bob", "amount": true}"#,
            r#"{"target_user": "bob", "amount": 1e300}"#,
            r#"{"target_user": "bob", "amount": -5}"#,
            r#"{"target_user": "", "amount": 5}"#,
        ];
        for body in cases {
            match parse(body) {
                Err(RequestError::BadRequest(_)) => {}
                other => panic!("body {body:?} should be a bad request, got {other:?}"),
            }
        }
    }
}

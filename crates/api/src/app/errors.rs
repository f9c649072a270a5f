//! Outcome-to-response mapping.
//!
//! Failures are reported by status code alone; the body is always empty.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use racebank_infra::TransferError;

#[derive(Debug, Error)]
pub enum RequestError {
    /// Path is not `/<secure|insecure>/<account>/transfer`.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed body or fields, or a transfer the ledger refused.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Storage failure (any transaction already rolled back).
    #[error("internal error: {0}")]
    Internal(String),
}

impl RequestError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RequestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TransferError> for RequestError {
    fn from(value: TransferError) -> Self {
        match value {
            e @ TransferError::InsufficientFundsOrMissingAccount { .. } => {
                RequestError::BadRequest(e.to_string())
            }
            TransferError::Storage(e) => RequestError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            RequestError::Internal(_) => tracing::error!(status = status.as_u16(), "{self}"),
            _ => tracing::info!(status = status.as_u16(), "{self}"),
        }
        status.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racebank_core::AccountId;
    use racebank_infra::LedgerStoreError;

    #[test]
    fn transfer_errors_map_to_client_and_server_statuses() {
        let rejected = TransferError::InsufficientFundsOrMissingAccount {
            from: AccountId::new("alice").unwrap(),
            to: AccountId::new("bob").unwrap(),
        };
        assert_eq!(RequestError::from(rejected).status(), StatusCode::BAD_REQUEST);

        let storage = TransferError::Storage(LedgerStoreError::PoolClosed("acquire"));
        assert_eq!(
            RequestError::from(storage).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn responses_have_empty_bodies() {
        let response = RequestError::not_found("nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }
}

//! Request Dispatcher: `/<mode>/<account>/transfer`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::Uri,
    Json,
};
use tracing::Instrument;

use racebank_core::{AccountId, TransferIntent, TransferMode, TransferReceipt};
use racebank_infra::TransferError;

use crate::app::errors::RequestError;
use crate::app::services::AppServices;
use crate::app::dto;

/// Trailing path segment naming the only supported action.
pub const TRANSFER_ACTION: &str = "transfer";

/// Validate the request, run the transfer and map its outcome.
///
/// Checks run in order: path shape (404), body (400), mode (404), source (400).
/// The path is matched on the raw request target, so a query string makes the
/// last segment unrecognizable.
pub async fn dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    uri: Uri,
    body: Bytes,
) -> Result<Json<TransferReceipt>, RequestError> {
    let raw_target = uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str());
    let path = TransferPath::parse(raw_target)?;
    let (target, amount) = dto::parse_transfer_body(&body)?;
    let mode = path.mode()?;
    let source = path.source()?;

    let intent = TransferIntent::new(source, target, amount, mode);
    let receipt = run_detached(async move { services.executor().execute(&intent).await }).await?;
    Ok(Json(receipt))
}

/// The segments of `/<mode>/<account>/transfer`, not yet interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPath<'a> {
    mode: &'a str,
    source: &'a str,
}

impl<'a> TransferPath<'a> {
    /// Split on `/` (leading and trailing slashes ignored) and require exactly
    /// three segments ending in `transfer`.
    pub fn parse(path: &'a str) -> Result<Self, RequestError> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let [mode, source, action] = segments.as_slice() else {
            return Err(RequestError::not_found(format!(
                "expected 3 path segments, got {}",
                segments.len()
            )));
        };
        if *action != TRANSFER_ACTION {
            return Err(RequestError::not_found(format!("unknown action '{action}'")));
        }
        Ok(Self {
            mode: *mode,
            source: *source,
        })
    }

    pub fn mode(&self) -> Result<TransferMode, RequestError> {
        self.mode
            .parse()
            .map_err(|e: racebank_core::DomainError| RequestError::not_found(e.to_string()))
    }

    pub fn source(&self) -> Result<AccountId, RequestError> {
        AccountId::new(self.source).map_err(|e| RequestError::bad_request(e.to_string()))
    }
}

/// Execute on a detached task: once started, a transfer finishes and its
/// transaction is resolved even if the caller goes away.
async fn run_detached<F>(transfer: F) -> Result<TransferReceipt, RequestError>
where
    F: Future<Output = Result<TransferReceipt, TransferError>> + Send + 'static,
{
    let mut watch = DisconnectWatch::armed();

    let joined = tokio::spawn(transfer.in_current_span()).await;
    watch.disarm();

    let outcome =
        joined.map_err(|e| RequestError::Internal(format!("transfer task failed: {e}")))?;
    Ok(outcome?)
}

/// Logs when the handler is dropped before producing a response, which
/// happens when the client disconnects mid-request.
struct DisconnectWatch {
    armed: bool,
}

impl DisconnectWatch {
    fn armed() -> Self {
        Self { armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DisconnectWatch {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("client closed connection before response finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::http::StatusCode;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::util::SubscriberInitExt;

    use super::*;

    fn shape_status(path: &str) -> Option<u16> {
        TransferPath::parse(path).err().map(|e| e.status().as_u16())
    }

    #[test]
    fn parses_mode_and_source() {
        let path = TransferPath::parse("/secure/alice/transfer").unwrap();
        assert_eq!(path.mode().unwrap(), TransferMode::Secure);
        assert_eq!(path.source().unwrap().as_str(), "alice");

        let path = TransferPath::parse("/insecure/bob/transfer/").unwrap();
        assert_eq!(path.mode().unwrap(), TransferMode::Insecure);
    }

    #[test]
    fn malformed_shapes_are_not_found() {
        for path in [
            "/",
            "/secure/alice",
            "/secure/alice/transfer/extra",
            "/secure/alice/withdraw",
            "/secure/alice/transfer?note=1",
        ] {
            assert_eq!(shape_status(path), Some(404), "path {path}");
        }
    }

    #[test]
    fn unknown_mode_passes_shape_check_but_is_not_found() {
        for path in ["/other/alice/transfer", "/SECURE/alice/transfer"] {
            let parsed = TransferPath::parse(path).unwrap();
            assert_eq!(parsed.mode().unwrap_err().status(), StatusCode::NOT_FOUND, "path {path}");
        }
    }

    #[test]
    fn empty_source_is_bad_request() {
        let parsed = TransferPath::parse("/secure//transfer").unwrap();
        assert_eq!(parsed.source().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    /// Counts WARN events emitted while installed as the thread default.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_warnings() -> (Arc<AtomicUsize>, tracing::subscriber::DefaultGuard) {
        let warnings = Arc::new(AtomicUsize::new(0));
        let guard = tracing_subscriber::registry()
            .with(WarnCounter(warnings.clone()))
            .set_default();
        (warnings, guard)
    }

    async fn exploding_transfer() -> Result<TransferReceipt, TransferError> {
        panic!("transfer task exploded")
    }

    #[tokio::test]
    async fn panicked_transfer_is_internal_error_without_disconnect_warning() {
        let (warnings, _guard) = count_warnings();

        let err = run_detached(exploding_transfer()).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(warnings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abandoned_transfer_logs_disconnect() {
        let (warnings, _guard) = count_warnings();

        let slow = run_detached(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(TransferError::InsufficientFundsOrMissingAccount {
                from: AccountId::new("alice").unwrap(),
                to: AccountId::new("bob").unwrap(),
            })
        });
        assert!(tokio::time::timeout(Duration::from_millis(20), slow).await.is_err());

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }
}

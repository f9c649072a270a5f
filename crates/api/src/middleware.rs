use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, Span};
use uuid::Uuid;

use racebank_infra::BalanceObserver;

/// Per-request span, plus one balance report after the response is produced.
///
/// The report runs on every exit path: success, rejection and storage
/// failure alike. If the request future is dropped before completing, the
/// report is handed to the runtime instead of being lost.
pub async fn report_balances(
    State(observer): State<BalanceObserver>,
    req: Request,
    next: Next,
) -> Response {
    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::now_v7(),
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        tracing::info!("incoming request");
        let report = BalanceReport::new(observer);

        let response = next.run(req).await;
        tracing::info!(status = response.status().as_u16(), "request completed");

        report.emit().await;
        response
    }
    .instrument(span)
    .await
}

/// Guarantees a single balance report per request.
struct BalanceReport {
    observer: Option<BalanceObserver>,
    span: Span,
}

impl BalanceReport {
    fn new(observer: BalanceObserver) -> Self {
        Self {
            observer: Some(observer),
            span: Span::current(),
        }
    }

    async fn emit(mut self) {
        if let Some(observer) = self.observer.take() {
            observer.report().await;
        }
    }
}

impl Drop for BalanceReport {
    fn drop(&mut self) {
        let Some(observer) = self.observer.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(
                    async move {
                        observer.report().await;
                    }
                    .instrument(self.span.clone()),
                );
            }
            Err(_) => tracing::warn!("no runtime available; balance report skipped"),
        }
    }
}

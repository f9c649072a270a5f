//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: ledger, executor and observer wiring
//! - `routes/`: the transfer dispatcher
//! - `dto.rs`: request body parsing
//! - `errors.rs`: outcome-to-status mapping

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Every request, whatever its path or method, is reported by the balance
/// middleware after the dispatcher has produced a response.
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let observer = services.observer().clone();

    routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                observer,
                middleware::report_balances,
            ))
            .layer(Extension(services)),
    )
}

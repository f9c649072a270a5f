use axum::Router;

pub mod transfer;

/// Router for the whole service.
///
/// There is a single endpoint, `/<mode>/<account>/transfer`, accepted for any
/// method. The dispatcher parses every path itself so that malformed paths
/// map to the same not-found outcome as unknown modes.
pub fn router() -> Router {
    Router::new().fallback(transfer::dispatch)
}

use std::sync::Arc;

use anyhow::Context;

use racebank_api::app::{self, services};
use racebank_api::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    racebank_observability::init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let services = services::build_services(&config.ledger)
        .await
        .with_context(|| format!("failed to open ledger at {}", config.ledger.database_path.display()))?;
    let services = Arc::new(services);
    services.observer().report().await;

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

//! Startup: build the backend client, load the model catalog, assemble state.
//!
//! Any failure here is fatal. The gateway never serves traffic with an empty
//! catalog.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::backend::BackendClient;
use crate::catalog::ModelCatalog;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::server::openai_api::{build_router, AppState};

/// Build the shared application state, querying the backend once.
pub async fn bootstrap(config: Arc<Config>) -> anyhow::Result<Arc<AppState>> {
    let backend = BackendClient::new(config.clone()).context("failed to build backend client")?;

    info!(endpoint = backend.endpoint(), "Loading model catalog");
    let catalog = ModelCatalog::load(&backend)
        .await
        .context("failed to load model catalog from the Gonka API")?;

    let ids: Vec<&str> = catalog.list().iter().map(|m| m.id.as_str()).collect();
    info!(count = catalog.len(), models = ?ids, "Model catalog loaded");

    let metrics = Metrics::new().context("failed to register metrics")?;

    Ok(Arc::new(AppState {
        config,
        backend,
        catalog: Arc::new(catalog),
        metrics: Arc::new(metrics),
        start_time: Instant::now(),
    }))
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

//! gonka-gateway binary: parse configuration, load the model catalog, serve.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use gonka_gateway::config::{Cli, Config};
use gonka_gateway::server::{bootstrap, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();

    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "gonka_gateway=debug,tower_http=debug"
    } else {
        "gonka_gateway=info,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("gonka-gateway v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    // Load configuration.
    let config = match Config::from_cli(&cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    info!(
        endpoint = config.backend.endpoint,
        operator = %config.credentials.operator,
        provider = %config.credentials.provider,
        timeout_secs = config.backend.request_timeout.as_secs(),
        "Configuration loaded"
    );

    // Load the model catalog; no models means nothing to serve.
    let state = match bootstrap(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = format!("{e:#}"), "Startup failed");
            return Err(e);
        }
    };

    // Start the server.
    let listen_addr = config.server.listen_addr();
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    serve(listener, state, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

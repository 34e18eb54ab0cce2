//! Folio API Server

use anyhow::Context;
use clap::Parser;
use folio_api::auth::PasswordConfig;
use folio_api::create_router;
use folio_api::state::{AppState, Backends};
use folio_core::config::AppConfig;
use folio_store::PgStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "folio-api", version, about = "Folio content API server")]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "folio_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    if config.database.url.is_empty() {
        tracing::warn!("DATABASE_URL not set, using the in-memory store");
        return Ok(Backends::in_memory(config));
    }

    let store = PgStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to postgres")?;
    store.migrate().await.context("running migrations")?;
    tracing::info!("Connected to postgres");

    Ok(Backends::postgres(store, config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path.clone())?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    init_tracing(&config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let api_base = config.api_base();

    // Create application state
    let backends = build_backends(&config).await?;
    let state = Arc::new(AppState::new(config, backends, PasswordConfig::default()));

    // Create router
    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Folio API Server starting on http://{}", addr);
    tracing::info!("API base: {}", api_base);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("Folio API Server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM, marking the service not ready first
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.set_ready(false);
    tracing::info!("Shutdown signal received, draining connections");
}

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terapia::api::rate_limit::spawn_cleanup_task;
use terapia::cli::{cmd_check_config, cmd_create_admin, Cli, Commands};
use terapia::config::Config;
use terapia::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &cli.command {
        Some(Commands::CheckConfig) => cmd_check_config(&cli),
        Some(Commands::CreateAdmin { email, password }) => {
            cmd_create_admin(&config, email, password).await
        }
        Some(Commands::Serve) | None => serve(config).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    config.validate()?;

    tracing::info!("Starting Terapia v{}", env!("CARGO_PKG_VERSION"));

    // Initialize database
    let db = terapia::db::init(&config).await?;

    if let Some((email, password)) = config.bootstrap_admin() {
        terapia::api::auth::ensure_admin_user(&db, email, password).await?;
    }

    if config.database.seed_demo_data {
        terapia::db::seed_demo_therapists(&db).await?;
    }

    let state = Arc::new(AppState::new(config.clone(), db.clone())?);

    if config.rate_limit.enabled {
        spawn_cleanup_task(
            state.rate_limiter.clone(),
            config.rate_limit.cleanup_interval,
        );
    }

    let app = terapia::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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

    tracing::info!("Shutdown signal received");
}

//! apiseed REST API server binary.
//!
//! Serves the HTTP API on PostgreSQL, or on process-local stores with
//! `--memory`.

use std::time::Duration;

use apiseed_api::config::ApiConfig;
use apiseed_api::{AppState, router};
use apiseed_core::store::Stores;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Interval between purges of expired sessions and OAuth states.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "apiseed_server", about = "apiseed REST API server")]
struct Args {
    /// Port to listen on. Overrides the port of `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Use in-memory stores instead of PostgreSQL. All data is lost on exit.
    #[arg(long, default_value_t = false)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,apiseed_api=debug,apiseed_core=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env();
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host);
        config.bind_addr = format!("{host}:{port}");
    }
    if args.database_url.is_some() {
        config.database_url = args.database_url;
    }

    let stores = match (&config.database_url, args.memory) {
        (Some(database_url), false) => {
            info!(max_connections = args.max_connections, "connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(database_url)
                .await?;

            info!("running database migrations");
            apiseed_core::migrate::migrate(&pool).await?;
            Stores::postgres(pool)
        }
        (None, false) => {
            return Err("DATABASE_URL is not set; pass --database-url or --memory".into());
        }
        (_, true) => {
            warn!("using in-memory stores; data will not survive a restart");
            Stores::memory()
        }
    };

    if config.facebook.is_none() {
        info!("facebook login disabled (FACEBOOK_CLIENT_ID / FACEBOOK_CLIENT_SECRET not set)");
    }

    let state = AppState::new(stores, config.clone());
    let shutdown = CancellationToken::new();
    let purge_handle = tokio::spawn(purge_loop(state.clone(), shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await;

    shutdown.cancel();
    let _ = purge_handle.await;
    info!("server stopped");

    result?;
    Ok(())
}

/// Periodically purge expired sessions and OAuth states until cancelled.
async fn purge_loop(state: AppState, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = apiseed_api::services::auth::purge_expired(&state).await {
                    warn!("session purge failed: {e}");
                }
            }
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM, and cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
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
    info!("shutdown signal received");
    shutdown.cancel();
}

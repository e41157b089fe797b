//! payapp - multi-currency payment ledger API

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payapp::config::StoreBackend;
use payapp::domain::SystemClock;
use payapp::ledger::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use payapp::{build_router, build_state, db, oracle, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payapp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        policy = ?config.conversion_policy,
        "Starting payapp server"
    );

    match &config.store {
        StoreBackend::Postgres { database_url } => {
            tracing::info!("Connecting to database...");
            let pool = db::connect(database_url, config.database_max_connections).await?;
            db::verify_connection(&pool).await?;

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            serve(&config, addr, PgLedgerStore::new(pool.clone())).await?;

            pool.close().await;
            tracing::info!("Database connections closed. Goodbye!");
        }
        StoreBackend::Memory => {
            if config.is_production() {
                tracing::warn!("In-memory ledger store in production: balances are lost on restart");
            }
            serve(&config, addr, MemoryLedgerStore::new()).await?;
        }
    }

    Ok(())
}

async fn serve<S: LedgerStore>(config: &Config, addr: SocketAddr, store: S) -> anyhow::Result<()> {
    let oracle = oracle::from_config(config)?;
    tracing::info!(oracle = oracle.name(), "Rate oracle configured");

    let state = build_state(config, store, oracle, Arc::new(SystemClock));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

//! payapp Library
//!
//! Multi-currency payment ledger: accounts, direct payments and payment
//! requests, with currency normalization through a rate oracle.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod ledger;
pub mod oracle;

mod error;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

pub use api::AppState;
pub use config::Config;
pub use domain::{Amount, AmountError, Balance, Currency, DomainError, OperationContext};
pub use error::{AppError, AppResult, ErrorResponse};

use crate::domain::Clock;
use crate::handlers::TransferEngine;
use crate::ledger::LedgerStore;
use crate::oracle::{RateOracle, StaticRateTable};

/// Wire the services for `store` according to `config`
pub fn build_state<S: LedgerStore>(
    config: &Config,
    store: S,
    oracle: Arc<dyn RateOracle>,
    clock: Arc<dyn Clock>,
) -> AppState<S> {
    let engine = TransferEngine::new(Arc::new(store), oracle, clock)
        .with_policy(config.conversion_policy);

    AppState::new(
        Arc::new(engine),
        config.starting_balance,
        config.starting_currency.clone(),
        StaticRateTable::with_defaults(),
    )
}

/// Build the application router
pub fn build_router<S: LedgerStore>(state: AppState<S>) -> Router {
    // Layers run last-added first: context -> logging -> handler
    let api_routes = api::create_router::<S>()
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(middleware::from_fn(
            api::middleware::request_context_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(api::routes::conversion_router::<S>())
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use payapp::config::{ConversionPolicy, OracleKind, StoreBackend};
use payapp::domain::{Amount, Currency, SystemClock};
use payapp::ledger::MemoryLedgerStore;
use payapp::oracle::{RateOracle, StaticRateTable};
use payapp::{build_router, build_state, Config};

/// Configuration for in-process tests: memory store, static oracle
pub fn test_config() -> Config {
    Config {
        store: StoreBackend::Memory,
        database_max_connections: 1,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        rate_oracle: OracleKind::Static,
        rate_oracle_timeout_ms: 1000,
        conversion_policy: ConversionPolicy::IndependentLegs,
        starting_balance: Amount::new(1000.into()).unwrap(),
        starting_currency: Currency::gbp(),
    }
}

/// App over a fresh in-memory ledger with the default rate table
pub fn memory_app() -> (Router, MemoryLedgerStore) {
    memory_app_with_oracle(Arc::new(StaticRateTable::with_defaults()))
}

pub fn memory_app_with_oracle(oracle: Arc<dyn RateOracle>) -> (Router, MemoryLedgerStore) {
    let store = MemoryLedgerStore::new();
    let state = build_state(&test_config(), store.clone(), oracle, Arc::new(SystemClock));
    (build_router(state), store)
}

/// Send a request, optionally as `user`, and decode the JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-Request-User-Id", user.to_string());
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

/// Open an account for a new user and return its owner id
pub async fn open_account(app: &Router, currency: &str) -> Uuid {
    let owner = Uuid::new_v4();
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/accounts",
        Some(owner),
        Some(serde_json::json!({ "currency": currency })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "account creation failed: {}", body);
    owner
}

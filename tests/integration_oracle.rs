//! HTTP rate oracle against a locally served conversion endpoint

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;

use payapp::domain::Currency;
use payapp::oracle::{HttpRateOracle, OracleError, RateOracle};

mod common;

use common::{memory_app, memory_app_with_oracle, open_account, send};

/// Serve a memory-backed app on an ephemeral port
async fn spawn_conversion_service() -> SocketAddr {
    let (app, _) = memory_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn oracle_for(addr: SocketAddr) -> HttpRateOracle {
    HttpRateOracle::new(format!("http://{}/", addr), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_http_oracle_converts() {
    let addr = spawn_conversion_service().await;
    let oracle = oracle_for(addr);

    let converted = oracle
        .convert(&Currency::gbp(), &Currency::usd(), dec!(10))
        .await
        .unwrap();
    assert_eq!(converted, dec!(13.3));

    let converted = oracle
        .convert(&Currency::usd(), &Currency::eur(), dec!(10.01))
        .await
        .unwrap();
    assert_eq!(converted, dec!(8.51));
}

#[tokio::test]
async fn test_http_oracle_unsupported_pair_is_unavailable() {
    let addr = spawn_conversion_service().await;
    let oracle = oracle_for(addr);

    let result = oracle
        .convert(&Currency::gbp(), &Currency::new("JPY").unwrap(), dec!(10))
        .await;

    assert!(matches!(result, Err(OracleError::Unavailable(_))));
}

#[tokio::test]
async fn test_transfer_through_remote_oracle() {
    let addr = spawn_conversion_service().await;
    let (app, _) = memory_app_with_oracle(Arc::new(oracle_for(addr)));

    let alice = open_account(&app, "EUR").await;
    let bob = open_account(&app, "USD").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(alice),
        Some(json!({ "recipient_id": bob, "amount": "10", "currency": "EUR" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["debited_amount"], "10.00");
    assert_eq!(body["credited_amount"], "11.80");
    assert_eq!(body["conversion_applied"], true);
}

#[tokio::test]
async fn test_transfer_falls_back_when_remote_oracle_is_down() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (app, _) = memory_app_with_oracle(Arc::new(oracle_for(addr)));

    // Starting balances also fall back to the raw 1000
    let alice = open_account(&app, "GBP").await;
    let bob = open_account(&app, "USD").await;

    let (_, body) = send(&app, "GET", &format!("/api/v1/accounts/{}", bob), Some(bob), None).await;
    assert_eq!(body["balance"], "1000.00");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(alice),
        Some(json!({ "recipient_id": bob, "amount": "10", "currency": "GBP" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["credited_amount"], "10.00");
    assert_eq!(body["conversion_applied"], false);
    assert_eq!(body["warnings"].as_array().map(|w| w.len()), Some(1));
}

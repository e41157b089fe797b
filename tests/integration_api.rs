//! API integration tests over the in-memory ledger

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

use common::{memory_app, open_account, send};

#[tokio::test]
async fn test_health() {
    let (app, _) = memory_app();

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_conversion_endpoint() {
    let (app, _) = memory_app();

    let (status, body) = send(&app, "GET", "/conversion/GBP/USD/10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["converted_amount"].as_f64(), Some(13.3));
    assert_eq!(body["rate"].as_f64(), Some(1.33));

    let (status, body) = send(&app, "GET", "/conversion/eur/eur/12.5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["converted_amount"].as_f64(), Some(12.5));

    let (status, _) = send(&app, "GET", "/conversion/GBP/JPY/10", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/conversion/GBP/USD/ten", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_conversion_endpoint_rejects_overflowing_amount() {
    let (app, _) = memory_app();

    let (status, body) = send(
        &app,
        "GET",
        "/conversion/GBP/USD/79228162514264337593543950335",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");

    // Identity conversions still go through the same checked path
    let (status, body) = send(&app, "GET", "/conversion/EUR/EUR/99999999.99", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["converted_amount"], 99999999.99);
}

#[tokio::test]
async fn test_open_account_seeds_starting_balance() {
    let (app, _) = memory_app();

    let gbp = open_account(&app, "GBP").await;
    let usd = open_account(&app, "usd").await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/accounts/{}", gbp), Some(gbp), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"], "GBP");
    assert_eq!(body["balance"], "1000.00");

    let (_, body) = send(&app, "GET", &format!("/api/v1/accounts/{}", usd), Some(usd), None).await;
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["balance"], "1330.00");
}

#[tokio::test]
async fn test_open_account_errors() {
    let (app, _) = memory_app();
    let owner = open_account(&app, "EUR").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/accounts",
        Some(owner),
        Some(json!({ "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "account_exists");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/accounts",
        Some(Uuid::new_v4()),
        Some(json!({ "currency": "JPY" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_currency");
}

#[tokio::test]
async fn test_cross_currency_payment() {
    let (app, store) = memory_app();
    let alice = open_account(&app, "GBP").await;
    let bob = open_account(&app, "USD").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(alice),
        Some(json!({ "recipient_id": bob, "amount": "10", "currency": "GBP" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["debited_amount"], "10.00");
    assert_eq!(body["debited_currency"], "GBP");
    assert_eq!(body["credited_amount"], "13.30");
    assert_eq!(body["credited_currency"], "USD");
    assert_eq!(body["original_amount"], "10.00");
    assert_eq!(body["origin"], "direct");
    assert_eq!(body["conversion_applied"], true);
    assert!(body.get("warnings").is_none());

    let (_, body) = send(&app, "GET", &format!("/api/v1/accounts/{}", alice), Some(alice), None).await;
    assert_eq!(body["balance"], "990.00");
    let (_, body) = send(&app, "GET", &format!("/api/v1/accounts/{}", bob), Some(bob), None).await;
    assert_eq!(body["balance"], "1343.30");

    assert_eq!(store.payments().await.len(), 1);
}

#[tokio::test]
async fn test_payment_errors() {
    let (app, store) = memory_app();
    let alice = open_account(&app, "GBP").await;
    let bob = open_account(&app, "GBP").await;

    // No acting user
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        None,
        Some(json!({ "recipient_id": bob, "amount": "10", "currency": "GBP" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "missing_header");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(alice),
        Some(json!({ "recipient_id": bob, "amount": "5000", "currency": "GBP" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "insufficient_funds");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(alice),
        Some(json!({ "recipient_id": bob, "amount": "1.005", "currency": "GBP" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_amount");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(alice),
        Some(json!({ "recipient_id": Uuid::new_v4(), "amount": "1", "currency": "GBP" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "account_not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(alice),
        Some(json!({ "recipient_id": alice, "amount": "1", "currency": "GBP" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "same_account_transfer");

    assert!(store.payments().await.is_empty());
}

#[tokio::test]
async fn test_request_accept_flow() {
    let (app, _) = memory_app();
    let requester = open_account(&app, "GBP").await;
    let requestee = open_account(&app, "EUR").await;

    let (status, request) = send(
        &app,
        "POST",
        "/api/v1/requests",
        Some(requester),
        Some(json!({ "requestee_id": requestee, "amount": "20", "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", request);
    assert_eq!(request["status"], "pending");
    assert_eq!(request["amount"], "20.00");
    let request_id = request["id"].as_str().unwrap().to_string();

    // Only the requestee may accept
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/accept", request_id),
        Some(requester),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "unauthorized");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/accept", request_id),
        Some(requestee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["request"]["status"], "accepted");
    assert_eq!(body["payment"]["origin"], "request");
    assert_eq!(body["payment"]["request_id"], request_id.as_str());
    assert_eq!(body["payment"]["debited_amount"], "20.00");
    assert_eq!(body["payment"]["credited_amount"], "17.60");
    assert_eq!(body["payment"]["credited_currency"], "GBP");

    let (_, body) = send(&app, "GET", &format!("/api/v1/accounts/{}", requestee), Some(requestee), None).await;
    assert_eq!(body["balance"], "1120.00");
    let (_, body) = send(&app, "GET", &format!("/api/v1/accounts/{}", requester), Some(requester), None).await;
    assert_eq!(body["balance"], "1017.60");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/accept", request_id),
        Some(requestee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "invalid_state");
}

#[tokio::test]
async fn test_request_reject_flow() {
    let (app, store) = memory_app();
    let requester = open_account(&app, "USD").await;
    let requestee = open_account(&app, "USD").await;

    let (_, request) = send(
        &app,
        "POST",
        "/api/v1/requests",
        Some(requester),
        Some(json!({ "requestee_id": requestee, "amount": "50.00", "currency": "USD" })),
    )
    .await;
    let request_id = request["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/reject", request_id),
        Some(requestee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/requests/{}", request_id),
        Some(requester),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/accept", request_id),
        Some(requestee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Outsiders cannot see the request
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/requests/{}", request_id),
        Some(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(store.payments().await.is_empty());
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let (app, _) = memory_app();
    let user = open_account(&app, "GBP").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/reject", Uuid::new_v4()),
        Some(user),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "request_not_found");
}

#[tokio::test]
async fn test_account_is_private() {
    let (app, _) = memory_app();
    let owner = open_account(&app, "GBP").await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/accounts/{}", owner),
        Some(Uuid::new_v4()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_request_context_headers() {
    let (app, _) = memory_app();
    let correlation_id = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/accounts/{}", Uuid::new_v4()))
                .header("X-Request-User-Id", "not-a-uuid")
                .header("X-Correlation-Id", correlation_id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let user = Uuid::new_v4();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/accounts/{}", user))
                .header("X-Request-User-Id", user.to_string())
                .header("X-Correlation-Id", correlation_id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()["x-correlation-id"],
        correlation_id.to_string().as_str()
    );
}

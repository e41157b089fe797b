//! API Middleware
//!
//! Request context extraction and request logging.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::IpAddr;
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;

pub const REQUEST_USER_HEADER: &str = "x-request-user-id";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Acting user of an operation; fails if the header was not sent
pub fn acting_user(context: &OperationContext) -> Result<Uuid, AppError> {
    context
        .request_user_id
        .ok_or_else(|| AppError::MissingHeader(REQUEST_USER_HEADER.to_string()))
}

// =========================================================================
// Request context middleware
// =========================================================================

/// Build the [`OperationContext`] for the request.
///
/// Authentication happens upstream; this only trusts the acting-user header
/// it is given. A malformed user id is rejected, a missing one is left for
/// the route to decide.
pub async fn request_context_middleware(
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let mut context = OperationContext::new();

    if let Some(user_id_str) = headers.get(REQUEST_USER_HEADER).and_then(|v| v.to_str().ok()) {
        match Uuid::parse_str(user_id_str.trim()) {
            Ok(user_id) => context = context.with_request_user(user_id),
            Err(_) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Invalid X-Request-User-Id header format",
                        "error_code": "invalid_user_id"
                    })),
                )
                    .into_response());
            }
        }
    }

    // Reuse the caller's correlation ID or generate a new one
    if let Some(correlation_id) = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
    {
        context = context.with_correlation_id(correlation_id);
    }
    let correlation_id = context.ensure_correlation_id();

    if let Some(ip) = client_ip(&headers) {
        context = context.with_client_ip(ip);
    }

    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = correlation_id.to_string().parse() {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    Ok(response)
}

/// First address of X-Forwarded-For, if any
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "proxy-authorization"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let headers = mask_headers_for_logging(request.headers());

    let (correlation_id, request_user_id) = request
        .extensions()
        .get::<OperationContext>()
        .map(|ctx| (ctx.correlation_id, ctx.request_user_id))
        .unwrap_or_default();

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        correlation_id = ?correlation_id,
        request_user_id = ?request_user_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}

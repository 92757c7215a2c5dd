// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

use axum::{
    http::{header::HeaderName, HeaderValue},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::ratelimit::RateLimitDecision;
use crate::state::AppState;

pub mod health;
pub mod verify;
pub mod webhook;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/verify", post(verify::verify_wallet))
        .route(
            "/webhooks/application-approved",
            post(webhook::application_approved),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        verify::verify_wallet,
        webhook::application_approved
    ),
    components(schemas(
        health::HealthResponse,
        verify::VerifyRequest,
        verify::VerifyResponse,
        webhook::ApprovalRequest,
        webhook::ApprovalResponse
    )),
    tags(
        (name = "Health", description = "Liveness checks"),
        (name = "Verification", description = "Wallet ownership verification"),
        (name = "Webhooks", description = "Platform-to-bot callbacks")
    )
)]
pub struct ApiDoc;

/// Attach `X-RateLimit-*` headers to a response. `X-RateLimit-Reset` is unix
/// seconds; the limiter tracks milliseconds internally.
pub(crate) fn with_rate_limit_headers(
    decision: &RateLimitDecision,
    mut response: Response,
) -> Response {
    let headers = response.headers_mut();
    let mut set = |name: &'static str, value: String| {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    };
    set("x-ratelimit-limit", decision.limit.to_string());
    set("x-ratelimit-remaining", decision.remaining.to_string());
    set("x-ratelimit-reset", (decision.reset_at_ms / 1000).to_string());
    response
}

/// Client identifier for rate limiting: first `X-Forwarded-For` entry, or a
/// fixed bucket when the header is absent.
pub(crate) fn client_identifier(headers: &axum::http::HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

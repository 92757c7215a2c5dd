// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// HTTP-facing error with a status code and a client-visible message.
///
/// Internal errors are constructed through [`ApiError::internal`], which
/// swaps the detailed message for a generic one in production.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400: malformed request shape or address format.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401: signature, API-key, or webhook-signature mismatch.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 429: rate limit exceeded.
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    /// 500: internal failure. In production the detail is logged, never sent.
    pub fn internal(detail: impl Into<String>, production: bool) -> Self {
        let detail = detail.into();
        tracing::error!(error = %detail, "internal server error");
        let message = if production {
            "Internal server error".to_string()
        } else {
            detail
        };
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let bad = ApiError::bad_request("bad shape");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad shape");

        let auth = ApiError::unauthorized("invalid signature");
        assert_eq!(auth.status, StatusCode::UNAUTHORIZED);

        let limited = ApiError::too_many_requests("slow down");
        assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn internal_redacts_detail_in_production() {
        let dev = ApiError::internal("decrypt blew up", false);
        assert_eq!(dev.message, "decrypt blew up");

        let prod = ApiError::internal("decrypt blew up", true);
        assert_eq!(prod.message, "Internal server error");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}

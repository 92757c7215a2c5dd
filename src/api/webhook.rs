// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Approval webhook: the platform calls this after an admin approves a
//! trader application. The request is authenticated with an API key and an
//! HMAC-SHA256 signature over the raw body, then handed to the provisioner.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;
use utoipa::ToSchema;

use super::{client_identifier, with_rate_limit_headers};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{
    audit_best_effort, ApplicationApproval, ApprovalRepository, AuditEvent, AuditEventType,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub trader_wallet: String,
    pub channel_name: String,
    pub max_members: Option<u32>,
    pub subscription_price: Option<f64>,
    pub channel_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct ApprovalResponse {
    pub success: bool,
    pub role_id: String,
    pub channel_id: String,
}

/// Constant-time verification of a hex HMAC-SHA256 signature over the raw
/// request body. Malformed hex fails closed.
fn signature_matches(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[utoipa::path(
    post,
    path = "/webhooks/application-approved",
    request_body = ApprovalRequest,
    tag = "Webhooks",
    responses(
        (status = 200, body = ApprovalResponse),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "API key or signature mismatch"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn application_approved(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let identifier = client_identifier(&headers);
    let decision = match state.rate_limiter.check(&identifier, "webhook") {
        Ok(decision) => decision,
        Err(e) => {
            return ApiError::internal(
                format!("rate limiter failure: {e}"),
                state.config.production,
            )
            .into_response()
        }
    };
    if !decision.allowed {
        let error = ApiError::too_many_requests("Too many requests");
        return with_rate_limit_headers(&decision, error.into_response());
    }

    let response = match handle(&state, &headers, &body).await {
        Ok(body) => Json(body).into_response(),
        Err(error) => error.into_response(),
    };
    with_rate_limit_headers(&decision, response)
}

async fn handle(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ApprovalResponse, ApiError> {
    match &state.config.api_key {
        Some(expected) => {
            let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
            if provided != Some(expected.as_str()) {
                return Err(ApiError::unauthorized("Invalid API key"));
            }
        }
        None => warn!("API_KEY not configured, accepting webhook without API key check"),
    }

    match &state.config.webhook_secret {
        Some(secret) => {
            let provided = headers
                .get("x-webhook-signature")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if !signature_matches(secret, body, provided) {
                return Err(ApiError::unauthorized("Invalid webhook signature"));
            }
        }
        None => warn!("WEBHOOK_SECRET not configured, accepting webhook without signature check"),
    }

    let request: ApprovalRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Malformed approval body: {e}")))?;
    if request.trader_wallet.is_empty()
        || request.channel_name.is_empty()
        || request.channel_id.is_empty()
    {
        return Err(ApiError::bad_request("Missing required fields"));
    }

    let approval = ApplicationApproval {
        approval_id: uuid::Uuid::new_v4().to_string(),
        channel_id: request.channel_id.clone(),
        trader_wallet: request.trader_wallet.clone(),
        channel_name: request.channel_name.clone(),
        max_members: request.max_members,
        subscription_price: request.subscription_price,
        provisioned: false,
        created_at: Utc::now(),
    };
    let approvals = ApprovalRepository::new(&state.store);
    approvals.create(&approval).map_err(|e| {
        ApiError::internal(
            format!("failed to persist approval: {e}"),
            state.config.production,
        )
    })?;

    let provisioned = state
        .provisioner
        .create_trader_channel(
            &request.channel_name,
            &request.trader_wallet,
            &request.channel_id,
        )
        .await
        .map_err(|e| {
            ApiError::internal(
                format!("provisioning failed: {e}"),
                state.config.production,
            )
        })?;

    if let Err(e) = approvals.mark_provisioned(&approval.approval_id) {
        warn!(approval_id = %approval.approval_id, error = %e, "failed to mark approval as provisioned");
    }
    audit_best_effort(
        &state.store,
        AuditEvent::new(AuditEventType::ApplicationApproved)
            .with_channel(&request.channel_id)
            .with_details(serde_json::json!({
                "approval_id": approval.approval_id,
                "role_id": provisioned.role_id,
            })),
    );

    Ok(ApprovalResponse {
        success: true,
        role_id: provisioned.role_id,
        channel_id: provisioned.discord_channel_id,
    })
}

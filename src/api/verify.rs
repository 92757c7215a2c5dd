// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Wallet verification endpoint: proves ownership of a Solana address via an
//! Ed25519 signature, stores the encrypted address, and immediately runs a
//! reconciliation pass so the caller's roles reflect the verification.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use base64ct::{Base64, Encoding};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{client_identifier, with_rate_limit_headers};
use crate::chain::{is_valid_address_shape, verify_signature};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{
    audit_best_effort, AuditEvent, AuditEventType, VerificationRepository, WalletVerification,
};
use crate::vault::Vault;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Base58 Solana address being claimed.
    pub wallet_address: String,
    /// Base64 Ed25519 signature over `message`.
    pub signature: String,
    /// The challenge message that was signed.
    pub message: String,
    /// Discord user claiming the wallet.
    pub discord_user_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {
    pub success: bool,
}

#[utoipa::path(
    post,
    path = "/verify",
    request_body = VerifyRequest,
    tag = "Verification",
    responses(
        (status = 200, body = VerifyResponse),
        (status = 400, description = "Malformed request or address"),
        (status = 401, description = "Signature does not prove ownership"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn verify_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyRequest>,
) -> Response {
    let identifier = client_identifier(&headers);
    let decision = match state.rate_limiter.check(&identifier, "verify") {
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
        audit_best_effort(
            &state.store,
            AuditEvent::new(AuditEventType::RateLimitBlocked)
                .with_details(serde_json::json!({ "identifier": identifier, "endpoint": "verify" })),
        );
        let error = ApiError::too_many_requests("Too many verification attempts, try again later");
        return with_rate_limit_headers(&decision, error.into_response());
    }

    let response = match handle(&state, request).await {
        Ok(body) => Json(body).into_response(),
        Err(error) => error.into_response(),
    };
    with_rate_limit_headers(&decision, response)
}

async fn handle(state: &AppState, request: VerifyRequest) -> Result<VerifyResponse, ApiError> {
    if request.wallet_address.is_empty()
        || request.signature.is_empty()
        || request.message.is_empty()
        || request.discord_user_id.is_empty()
    {
        return Err(ApiError::bad_request("Missing required fields"));
    }
    if !is_valid_address_shape(&request.wallet_address) {
        return Err(ApiError::bad_request("Invalid wallet address format"));
    }

    let wallet_hash = Vault::hash(&request.wallet_address);

    if !verify_signature(&request.wallet_address, &request.message, &request.signature) {
        audit_best_effort(
            &state.store,
            AuditEvent::new(AuditEventType::VerificationRejected)
                .with_user(&request.discord_user_id)
                .with_wallet_hash(&wallet_hash),
        );
        // Deliberately unspecific about which input failed.
        return Err(ApiError::unauthorized("Invalid signature"));
    }

    let envelope = Base64::encode_string(&state.vault.encrypt(&request.wallet_address));
    let now = Utc::now();
    VerificationRepository::new(&state.store)
        .upsert(WalletVerification {
            discord_user_id: request.discord_user_id.clone(),
            wallet_address_encrypted: envelope,
            wallet_address_hash: wallet_hash.clone(),
            signature_proof: request.signature.clone(),
            verification_message: request.message.clone(),
            verified_at: now,
            created_at: now,
        })
        .map_err(|e| {
            ApiError::internal(
                format!("failed to persist verification: {e}"),
                state.config.production,
            )
        })?;

    info!(
        discord_user_id = %request.discord_user_id,
        wallet_hash = %wallet_hash,
        "wallet verified"
    );
    audit_best_effort(
        &state.store,
        AuditEvent::new(AuditEventType::WalletVerified)
            .with_user(&request.discord_user_id)
            .with_wallet_hash(&wallet_hash),
    );

    // Synchronous pass so Discord access reflects the verification before
    // the response, not at the next timer tick.
    state.reconciler.run_once().await;

    Ok(VerifyResponse { success: true })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    use super::*;
    use crate::test_support::test_state;

    fn request(wallet: &str, signature: &str, message: &str, user: &str) -> VerifyRequest {
        VerifyRequest {
            wallet_address: wallet.to_string(),
            signature: signature.to_string(),
            message: message.to_string(),
            discord_user_id: user.to_string(),
        }
    }

    /// Keypair plus its base58 address and a base64 signature over `message`.
    fn signed_challenge(message: &str) -> (String, String) {
        let key = SigningKey::generate(&mut OsRng);
        let address = bs58::encode(key.verifying_key().to_bytes()).into_string();
        let signature = Base64::encode_string(&key.sign(message.as_bytes()).to_bytes());
        (address, signature)
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let (_dir, state) = test_state();
        let response = verify_wallet(
            State(state),
            HeaderMap::new(),
            Json(request("", "sig", "msg", "user-1")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_address_is_rejected() {
        let (_dir, state) = test_state();
        let response = verify_wallet(
            State(state),
            HeaderMap::new(),
            Json(request("0OIl-not-base58", "sig", "msg", "user-1")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_signature_is_unauthorized() {
        let (_dir, state) = test_state();
        let (address, signature) = signed_challenge("verify me");
        let response = verify_wallet(
            State(state.clone()),
            HeaderMap::new(),
            Json(request(&address, &signature, "a different message", "user-1")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!VerificationRepository::new(&state.store).exists("user-1"));
    }

    #[tokio::test]
    async fn rate_limit_rejects_with_headers() {
        let (_dir, mut state) = test_state();
        // Replace the limiter with a single-request allowance.
        let dir = tempfile::tempdir().unwrap();
        state.rate_limiter = std::sync::Arc::new(
            crate::ratelimit::RateLimiter::open(&dir.path().join("rl.redb"), 60_000, 1).unwrap(),
        );

        let first = verify_wallet(
            State(state.clone()),
            HeaderMap::new(),
            Json(request("", "sig", "msg", "user-1")),
        )
        .await;
        // Counted even though validation rejected it.
        assert_eq!(first.status(), StatusCode::BAD_REQUEST);

        let second = verify_wallet(
            State(state),
            HeaderMap::new(),
            Json(request("", "sig", "msg", "user-1")),
        )
        .await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");
        assert!(second.headers().contains_key("x-ratelimit-reset"));
    }

    #[tokio::test]
    async fn valid_signature_persists_encrypted_record() {
        let (_dir, state) = test_state();
        let message = "link wallet to discord";
        let (address, signature) = signed_challenge(message);

        let response = verify_wallet(
            State(state.clone()),
            HeaderMap::new(),
            Json(request(&address, &signature, message, "user-1")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let stored = VerificationRepository::new(&state.store)
            .get("user-1")
            .unwrap();
        assert_eq!(stored.wallet_address_hash, Vault::hash(&address));
        // At rest the address only exists inside the AEAD envelope.
        assert!(!stored.wallet_address_encrypted.contains(&address));
        let envelope = Base64::decode_vec(&stored.wallet_address_encrypted).unwrap();
        assert_eq!(state.vault.decrypt(&envelope).unwrap(), address);
    }
}

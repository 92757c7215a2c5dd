// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Solana JSON-RPC client for subscription queries.
//!
//! The reconciler and verification gate talk to the chain through the
//! [`ChainQuery`] trait so tests can substitute fakes. The production
//! implementation speaks `getProgramAccounts` over plain JSON-RPC.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::types::{Subscription, SubscriptionCheck, SubscriptionStatus};

/// Byte offset of the subscriber pubkey within a subscription account
/// (8-byte discriminator precedes it).
const SUBSCRIBER_OFFSET: usize = 8;

/// Minimum account size: discriminator(8) + subscriber(32) + trader(32) +
/// channel id length prefix(4) + status(1) + expires_at(8).
const MIN_ACCOUNT_LEN: usize = 8 + 32 + 32 + 4 + 1 + 8;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("malformed account data: {0}")]
    Decode(String),
}

/// Read-side chain operations consumed by the reconciler and the gate.
pub trait ChainQuery: Send + Sync {
    /// Fetch all subscription records owned by `wallet_address`.
    ///
    /// This is the fallible primitive; reconciliation wraps it in
    /// [`super::retry::with_retry`] so exhaustion degrades to skipping the
    /// wallet for the pass.
    fn fetch_subscriptions(
        &self,
        wallet_address: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Subscription>, ChainError>> + Send;

    /// Infallible convenience form: any query failure yields an empty list.
    /// Callers must treat empty as "no known subscriptions": absence is
    /// revoke-eligible, never grant-eligible, so this degradation is safe.
    ///
    /// The reconciliation loop does not use this form; it needs to tell a
    /// failed query apart from an empty result to skip the wallet, so it
    /// wraps [`ChainQuery::fetch_subscriptions`] in the retry helper
    /// instead. This is the query surface for callers that can tolerate
    /// silent emptiness.
    fn get_subscriptions(
        &self,
        wallet_address: &str,
    ) -> impl std::future::Future<Output = Vec<Subscription>> + Send
    where
        Self: Sized,
    {
        async move {
            match self.fetch_subscriptions(wallet_address).await {
                Ok(subs) => subs,
                Err(e) => {
                    warn!(error = %e, "subscription query failed, treating as empty");
                    Vec::new()
                }
            }
        }
    }

    /// Authoritative check that `wallet_address` holds an active, unexpired
    /// subscription to `channel_id`.
    ///
    /// Always re-fetches from chain: this runs immediately before a role
    /// grant and must not trust a list computed earlier in the pass.
    fn validate_subscription(
        &self,
        wallet_address: &str,
        channel_id: &str,
    ) -> impl std::future::Future<Output = SubscriptionCheck> + Send
    where
        Self: Sized,
    {
        async move {
            let subs = match self.fetch_subscriptions(wallet_address).await {
                Ok(subs) => subs,
                Err(e) => return SubscriptionCheck::invalid(format!("query failed: {e}")),
            };
            let Some(sub) = subs.into_iter().find(|s| s.channel_id == channel_id) else {
                return SubscriptionCheck::invalid("no subscription for channel");
            };
            if !sub.is_active(Utc::now()) {
                return SubscriptionCheck::invalid(format!(
                    "subscription is {:?}",
                    sub.status
                ));
            }
            SubscriptionCheck::valid(sub)
        }
    }
}

// =============================================================================
// JSON-RPC wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProgramAccount {
    account: AccountInfo,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    /// `[data, encoding]` pair as returned with `encoding: "base64"`.
    data: (String, String),
}

// =============================================================================
// Client
// =============================================================================

/// Production [`ChainQuery`] implementation over Solana JSON-RPC.
pub struct SolanaRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    program_id: String,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            program_id: program_id.into(),
        }
    }

    async fn rpc_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: RpcResponse<T> = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ChainError::Rpc(format!("{} (code {})", err.message, err.code)));
        }
        response
            .result
            .ok_or_else(|| ChainError::Rpc("response carried neither result nor error".into()))
    }
}

impl ChainQuery for SolanaRpcClient {
    async fn fetch_subscriptions(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<Subscription>, ChainError> {
        let params = json!([
            self.program_id,
            {
                "encoding": "base64",
                "filters": [
                    { "memcmp": { "offset": SUBSCRIBER_OFFSET, "bytes": wallet_address } }
                ],
            }
        ]);

        let accounts: Vec<ProgramAccount> =
            self.rpc_call("getProgramAccounts", params).await?;

        let mut subscriptions = Vec::with_capacity(accounts.len());
        for account in accounts {
            let raw = Base64::decode_vec(&account.account.data.0)
                .map_err(|e| ChainError::Decode(format!("base64: {e}")))?;
            match decode_subscription_account(&raw) {
                Ok(sub) => subscriptions.push(sub),
                Err(e) => {
                    // One malformed account must not hide the others.
                    warn!(error = %e, "skipping undecodable subscription account");
                }
            }
        }
        Ok(subscriptions)
    }
}

/// Decode the fields this service consumes from a subscription account.
///
/// Layout: `discriminator(8) | subscriber(32) | trader(32) |
/// channel_id(u32 LE len + utf8) | status(u8) | expires_at(i64 LE, 0 = none)`.
fn decode_subscription_account(data: &[u8]) -> Result<Subscription, ChainError> {
    if data.len() < MIN_ACCOUNT_LEN {
        return Err(ChainError::Decode(format!(
            "account is {} bytes, need at least {MIN_ACCOUNT_LEN}",
            data.len()
        )));
    }

    let mut offset = 8 + 32 + 32;
    let len_bytes: [u8; 4] = data[offset..offset + 4].try_into().unwrap();
    let channel_len = u32::from_le_bytes(len_bytes) as usize;
    offset += 4;

    if data.len() < offset + channel_len + 1 + 8 {
        return Err(ChainError::Decode("channel id overruns account".into()));
    }

    let channel_id = std::str::from_utf8(&data[offset..offset + channel_len])
        .map_err(|_| ChainError::Decode("channel id is not UTF-8".into()))?
        .to_string();
    offset += channel_len;

    let status = SubscriptionStatus::from_code(data[offset]);
    offset += 1;

    let expiry_bytes: [u8; 8] = data[offset..offset + 8].try_into().unwrap();
    let expires_at = match i64::from_le_bytes(expiry_bytes) {
        0 => None,
        secs => Some(
            DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or_else(|| ChainError::Decode(format!("expiry {secs} out of range")))?,
        ),
    };

    Ok(Subscription {
        channel_id,
        status,
        expires_at,
    })
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Rolesync - Discord Role Synchronization for On-Chain Subscriptions
//!
//! This crate keeps Discord role assignments in a trading community guild
//! converged onto on-chain Solana subscription state: members prove wallet
//! ownership with an Ed25519 signature, and a reconciliation loop grants and
//! revokes channel roles from chain truth.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `chain` - Solana subscription queries and signature verification
//! - `discord` - Discord REST client behind a trait seam
//! - `sync` - The role reconciliation loop
//! - `provision` - Role/channel provisioning for approved traders
//! - `storage` - File-backed JSON records, audit log, redb rate limits
//! - `vault` - AEAD encryption of wallet addresses at rest

pub mod api;
pub mod chain;
pub mod config;
pub mod discord;
pub mod error;
pub mod provision;
pub mod ratelimit;
pub mod state;
pub mod storage;
pub mod sync;
pub mod vault;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::chain::SolanaRpcClient;
    use crate::config::Config;
    use crate::discord::DiscordRestClient;
    use crate::provision::ChannelProvisioner;
    use crate::ratelimit::RateLimiter;
    use crate::state::AppState;
    use crate::storage::{DataStore, StoragePaths};
    use crate::sync::RoleReconciler;
    use crate::vault::Vault;

    /// Full application state over a temp directory. The chain RPC and
    /// Discord endpoints point at an unroutable local port, so calls that
    /// reach them fail fast rather than leave the process.
    pub fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            encryption_key: [7u8; 32],
            discord_bot_token: "test-bot-token".to_string(),
            discord_guild_id: "guild-1".to_string(),
            subscription_program_id: "Sub1111111111111111111111111111111111111111".to_string(),
            solana_rpc_url: "http://127.0.0.1:9".to_string(),
            webhook_secret: Some("test-webhook-secret".to_string()),
            api_key: Some("test-api-key".to_string()),
            rate_limit_window_ms: 60_000,
            rate_limit_max_requests: 100,
            role_sync_interval_ms: 120_000,
            data_dir: dir.path().join("data"),
            host: "127.0.0.1".to_string(),
            port: 0,
            production: false,
        };

        let mut store = DataStore::new(StoragePaths::new(&config.data_dir));
        store.initialize().unwrap();
        let store = Arc::new(store);
        let vault = Vault::new(config.encryption_key);
        let rate_limiter = Arc::new(
            RateLimiter::open(
                &store.paths().ratelimit_db(),
                config.rate_limit_window_ms,
                config.rate_limit_max_requests,
            )
            .unwrap(),
        );
        let discord = || {
            DiscordRestClient::new(
                config.discord_bot_token.clone(),
                config.discord_guild_id.clone(),
            )
            .with_api_base("http://127.0.0.1:9")
        };
        let reconciler = Arc::new(RoleReconciler::new(
            store.clone(),
            vault.clone(),
            SolanaRpcClient::new(&config.solana_rpc_url, &config.subscription_program_id),
            discord(),
            Duration::from_millis(config.role_sync_interval_ms),
        ));
        let provisioner = Arc::new(ChannelProvisioner::new(store.clone(), discord()));

        let state = AppState {
            config: Arc::new(config),
            store,
            vault,
            rate_limiter,
            reconciler,
            provisioner,
        };
        (dir, state)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Role reconciliation: continuously converges Discord role assignments onto
//! on-chain subscription state.
//!
//! A pass walks every verified wallet against every channel mapping and
//! re-derives desired state from chain truth. No role or subscription state
//! is cached across passes. Passes run on a fixed timer and on demand after
//! a wallet verification; overlapping triggers are serialized through an
//! internal lock so at most one pass mutates roles at a time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chain::{with_default_retry, ChainQuery, SubscriptionStatus};
use crate::discord::DiscordApi;
use crate::storage::repository::{ChannelMapping, ChannelRepository, WalletVerification};
use crate::storage::{
    audit_best_effort, AuditEvent, AuditEventType, DataStore, VerificationRepository,
};
use crate::vault::Vault;

/// Default timer period between passes: 2 minutes.
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 120_000;

/// Counters from one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Verified wallets examined.
    pub wallets: usize,
    /// Roles granted this pass.
    pub granted: u32,
    /// Roles revoked this pass.
    pub revoked: u32,
    /// Wallets left untouched because decryption, the chain query, or the
    /// member lookup failed.
    pub skipped: u32,
}

/// Timer-driven reconciler over injected chain and Discord clients.
pub struct RoleReconciler<C, D> {
    store: Arc<DataStore>,
    vault: Vault,
    chain: C,
    discord: D,
    interval: Duration,
    // Serializes timer-driven and on-demand passes.
    pass_lock: tokio::sync::Mutex<()>,
}

impl<C: ChainQuery, D: DiscordApi> RoleReconciler<C, D> {
    pub fn new(
        store: Arc<DataStore>,
        vault: Vault,
        chain: C,
        discord: D,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            vault,
            chain,
            discord,
            interval,
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run passes on the configured interval until cancelled. The first pass
    /// starts immediately.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "role reconciler started"
        );
        loop {
            self.run_once().await;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => {
                    info!("role reconciler stopped");
                    break;
                }
            }
        }
    }

    /// Execute one full reconciliation pass. Always completes; all failures
    /// are contained to the wallet that raised them.
    pub async fn run_once(&self) -> PassSummary {
        let _pass = self.pass_lock.lock().await;

        let verifications = match VerificationRepository::new(&self.store).list_all() {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "failed to load wallet verifications, aborting pass");
                return PassSummary::default();
            }
        };
        let mappings = match ChannelRepository::new(&self.store).list_all() {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "failed to load channel mappings, aborting pass");
                return PassSummary::default();
            }
        };

        let mut summary = PassSummary {
            wallets: verifications.len(),
            ..PassSummary::default()
        };

        for wallet in &verifications {
            match self.reconcile_wallet(wallet, &mappings).await {
                Some((granted, revoked)) => {
                    summary.granted += granted;
                    summary.revoked += revoked;
                }
                None => summary.skipped += 1,
            }
        }

        info!(
            wallets = summary.wallets,
            granted = summary.granted,
            revoked = summary.revoked,
            skipped = summary.skipped,
            "role sync completed"
        );
        audit_best_effort(
            &self.store,
            AuditEvent::new(AuditEventType::SyncCompleted).with_details(serde_json::json!({
                "wallets": summary.wallets,
                "granted": summary.granted,
                "revoked": summary.revoked,
                "skipped": summary.skipped,
            })),
        );
        summary
    }

    /// Reconcile every mapping for a single wallet. Returns `None` when the
    /// wallet had to be skipped wholesale, leaving its roles untouched.
    async fn reconcile_wallet(
        &self,
        wallet: &WalletVerification,
        mappings: &[ChannelMapping],
    ) -> Option<(u32, u32)> {
        let user_id = &wallet.discord_user_id;

        let envelope = match Base64::decode_vec(&wallet.wallet_address_encrypted) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(discord_user_id = %user_id, error = %e, "stored envelope is not valid base64, skipping wallet");
                return None;
            }
        };
        let address = match self.vault.decrypt(&envelope) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                // Tamper or key mismatch, never "no data".
                error!(discord_user_id = %user_id, error = %e, "wallet address failed integrity check, skipping wallet");
                return None;
            }
        };

        let Some(subscriptions) = with_default_retry("fetch subscriptions", || {
            self.chain.fetch_subscriptions(&address)
        })
        .await
        else {
            warn!(discord_user_id = %user_id, "subscription query exhausted retries, leaving roles untouched");
            return None;
        };

        let mut held: HashSet<String> = match self.discord.member_role_ids(user_id).await {
            Ok(roles) => roles.into_iter().collect(),
            Err(e) => {
                warn!(discord_user_id = %user_id, error = %e, "member lookup failed, skipping wallet");
                return None;
            }
        };

        let active_channels: HashSet<&str> = subscriptions
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .map(|s| s.channel_id.as_str())
            .collect();

        let mut granted = 0u32;
        let mut revoked = 0u32;

        for mapping in mappings {
            let holds_role = held.contains(&mapping.discord_role_id);

            if active_channels.contains(mapping.channel_id.as_str()) {
                if holds_role {
                    continue;
                }
                // Authoritative re-check right before the mutation; the bulk
                // list alone never justifies a grant.
                let check = self
                    .chain
                    .validate_subscription(&address, &mapping.channel_id)
                    .await;
                if !check.valid {
                    warn!(
                        discord_user_id = %user_id,
                        channel_id = %mapping.channel_id,
                        reason = check.error.as_deref().unwrap_or("unknown"),
                        "subscription failed validation, withholding grant"
                    );
                    continue;
                }
                match self.discord.add_role(user_id, &mapping.discord_role_id).await {
                    Ok(()) => {
                        held.insert(mapping.discord_role_id.clone());
                        granted += 1;
                        info!(
                            discord_user_id = %user_id,
                            channel_id = %mapping.channel_id,
                            role_id = %mapping.discord_role_id,
                            "role granted"
                        );
                        audit_best_effort(
                            &self.store,
                            AuditEvent::new(AuditEventType::RoleGranted)
                                .with_user(user_id)
                                .with_wallet_hash(&wallet.wallet_address_hash)
                                .with_channel(&mapping.channel_id),
                        );
                    }
                    Err(e) => {
                        warn!(
                            discord_user_id = %user_id,
                            role_id = %mapping.discord_role_id,
                            error = %e,
                            "role grant failed"
                        );
                    }
                }
            } else if holds_role {
                match self
                    .discord
                    .remove_role(user_id, &mapping.discord_role_id)
                    .await
                {
                    Ok(()) => {
                        held.remove(&mapping.discord_role_id);
                        revoked += 1;
                        info!(
                            discord_user_id = %user_id,
                            channel_id = %mapping.channel_id,
                            role_id = %mapping.discord_role_id,
                            "role revoked"
                        );
                        audit_best_effort(
                            &self.store,
                            AuditEvent::new(AuditEventType::RoleRevoked)
                                .with_user(user_id)
                                .with_wallet_hash(&wallet.wallet_address_hash)
                                .with_channel(&mapping.channel_id),
                        );
                    }
                    Err(e) => {
                        warn!(
                            discord_user_id = %user_id,
                            role_id = %mapping.discord_role_id,
                            error = %e,
                            "role revoke failed"
                        );
                    }
                }
            }
        }

        Some((granted, revoked))
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Channel provisioning: turns an approved trader application into a Discord
//! role, a private text channel, and a persisted channel-role mapping.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::discord::{DiscordApi, DiscordError};
use crate::storage::{
    audit_best_effort, AuditEvent, AuditEventType, ChannelMapping, ChannelRepository, DataStore,
    StorageError,
};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Discord(#[from] DiscordError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Discord ids produced by a successful provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedChannel {
    pub role_id: String,
    pub discord_channel_id: String,
}

/// One-shot provisioner driven by the approval webhook. Discord failures
/// propagate to the caller unchanged; there is no internal retry.
pub struct ChannelProvisioner<D> {
    store: Arc<DataStore>,
    discord: D,
}

impl<D: DiscordApi> ChannelProvisioner<D> {
    pub fn new(store: Arc<DataStore>, discord: D) -> Self {
        Self { store, discord }
    }

    /// Create the `"{channel_name} Alpha"` role and the members-only text
    /// channel, then upsert the mapping keyed by `channel_id`.
    ///
    /// Re-provisioning an existing `channel_id` replaces the stored Discord
    /// ids with the newly created ones.
    pub async fn create_trader_channel(
        &self,
        channel_name: &str,
        trader_wallet: &str,
        channel_id: &str,
    ) -> Result<ProvisionedChannel, ProvisionError> {
        let role_name = format!("{channel_name} Alpha");
        let role_id = self.discord.create_role(&role_name).await?;

        let discord_channel_id = self
            .discord
            .create_private_text_channel(&slugify(channel_name), &role_id)
            .await?;

        ChannelRepository::new(&self.store).upsert(ChannelMapping {
            channel_id: channel_id.to_string(),
            trader_wallet: trader_wallet.to_string(),
            discord_role_id: role_id.clone(),
            discord_channel_id: discord_channel_id.clone(),
            channel_name: channel_name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })?;

        info!(
            channel_id = %channel_id,
            role_id = %role_id,
            discord_channel_id = %discord_channel_id,
            "trader channel provisioned"
        );
        audit_best_effort(
            &self.store,
            AuditEvent::new(AuditEventType::ChannelProvisioned)
                .with_channel(channel_id)
                .with_details(serde_json::json!({
                    "role_id": role_id,
                    "discord_channel_id": discord_channel_id,
                })),
        );

        Ok(ProvisionedChannel {
            role_id,
            discord_channel_id,
        })
    }
}

/// Lowercase Discord channel slug: alphanumerics kept, runs of anything else
/// collapsed to single hyphens, no leading or trailing hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

use std::sync::Arc;

use crate::chain::SolanaRpcClient;
use crate::config::Config;
use crate::discord::DiscordRestClient;
use crate::provision::ChannelProvisioner;
use crate::ratelimit::RateLimiter;
use crate::storage::DataStore;
use crate::sync::RoleReconciler;
use crate::vault::Vault;

/// Reconciler over the production chain and Discord clients.
pub type Reconciler = RoleReconciler<SolanaRpcClient, DiscordRestClient>;

/// Provisioner over the production Discord client.
pub type Provisioner = ChannelProvisioner<DiscordRestClient>;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<DataStore>,
    pub vault: Vault,
    pub rate_limiter: Arc<RateLimiter>,
    pub reconciler: Arc<Reconciler>,
    pub provisioner: Arc<Provisioner>,
}

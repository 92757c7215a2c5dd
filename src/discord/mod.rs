// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Discord guild operations behind a trait seam so the reconciler and
//! provisioner can be driven by a fake in tests.

pub mod rest;

use std::future::Future;

pub use rest::DiscordRestClient;

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("discord http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("discord api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected discord response: {0}")]
    Decode(String),
}

pub type DiscordResult<T> = Result<T, DiscordError>;

/// Guild mutations and lookups used by role sync and channel provisioning.
///
/// All ids are Discord snowflakes carried as strings; they exceed what an
/// f64-safe integer can hold and are never arithmetic operands.
pub trait DiscordApi: Send + Sync {
    /// Role ids currently held by a guild member.
    fn member_role_ids(
        &self,
        user_id: &str,
    ) -> impl Future<Output = DiscordResult<Vec<String>>> + Send;

    /// Grant a role to a guild member.
    fn add_role(
        &self,
        user_id: &str,
        role_id: &str,
    ) -> impl Future<Output = DiscordResult<()>> + Send;

    /// Remove a role from a guild member.
    fn remove_role(
        &self,
        user_id: &str,
        role_id: &str,
    ) -> impl Future<Output = DiscordResult<()>> + Send;

    /// Create a guild role, returning its id.
    fn create_role(&self, name: &str) -> impl Future<Output = DiscordResult<String>> + Send;

    /// Create a text channel visible only to holders of `role_id`,
    /// returning the channel id.
    fn create_private_text_channel(
        &self,
        name: &str,
        role_id: &str,
    ) -> impl Future<Output = DiscordResult<String>> + Send;
}

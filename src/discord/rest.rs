// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Discord REST v10 client implementing [`DiscordApi`] with a bot token.

use serde::Deserialize;
use serde_json::json;

use super::{DiscordApi, DiscordError, DiscordResult};

const API_BASE: &str = "https://discord.com/api/v10";

/// `VIEW_CHANNEL` permission bit.
const VIEW_CHANNEL: u64 = 1 << 10;

/// `SEND_MESSAGES` permission bit.
const SEND_MESSAGES: u64 = 1 << 11;

/// `READ_MESSAGE_HISTORY` permission bit.
const READ_MESSAGE_HISTORY: u64 = 1 << 16;

/// Guild text channel type.
const CHANNEL_TYPE_TEXT: u8 = 0;

/// Permission overwrite targeting a role.
const OVERWRITE_TYPE_ROLE: u8 = 0;

#[derive(Deserialize)]
struct GuildMember {
    roles: Vec<String>,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

/// Bot-authenticated client scoped to a single guild.
pub struct DiscordRestClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    guild_id: String,
}

impl DiscordRestClient {
    pub fn new(bot_token: String, guild_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            bot_token,
            guild_id,
        }
    }

    /// Override the API base address (proxies, local fakes).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Turn a non-success response into [`DiscordError::Api`] carrying the
    /// response body for diagnostics.
    async fn check_status(response: reqwest::Response) -> DiscordResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DiscordError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl DiscordApi for DiscordRestClient {
    async fn member_role_ids(&self, user_id: &str) -> DiscordResult<Vec<String>> {
        let url = format!("{}/guilds/{}/members/{user_id}", self.api_base, self.guild_id);
        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let member: GuildMember = Self::check_status(response).await?.json().await?;
        Ok(member.roles)
    }

    async fn add_role(&self, user_id: &str, role_id: &str) -> DiscordResult<()> {
        let url = format!(
            "{}/guilds/{}/members/{user_id}/roles/{role_id}",
            self.api_base, self.guild_id
        );
        let response = self
            .http
            .put(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn remove_role(&self, user_id: &str, role_id: &str) -> DiscordResult<()> {
        let url = format!(
            "{}/guilds/{}/members/{user_id}/roles/{role_id}",
            self.api_base, self.guild_id
        );
        let response = self
            .http
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn create_role(&self, name: &str) -> DiscordResult<String> {
        let url = format!("{}/guilds/{}/roles", self.api_base, self.guild_id);
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({
                "name": name,
                "mentionable": false,
                "hoist": false,
            }))
            .send()
            .await?;
        let role: Created = Self::check_status(response).await?.json().await?;
        Ok(role.id)
    }

    async fn create_private_text_channel(
        &self,
        name: &str,
        role_id: &str,
    ) -> DiscordResult<String> {
        let url = format!("{}/guilds/{}/channels", self.api_base, self.guild_id);
        // The @everyone role id equals the guild id.
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({
                "name": name,
                "type": CHANNEL_TYPE_TEXT,
                "permission_overwrites": [
                    {
                        "id": self.guild_id,
                        "type": OVERWRITE_TYPE_ROLE,
                        "deny": VIEW_CHANNEL.to_string(),
                    },
                    {
                        "id": role_id,
                        "type": OVERWRITE_TYPE_ROLE,
                        "allow": (VIEW_CHANNEL | SEND_MESSAGES | READ_MESSAGE_HISTORY).to_string(),
                    },
                ],
            }))
            .send()
            .await?;
        let channel: Created = Self::check_status(response).await?.json().await?;
        Ok(channel.id)
    }
}

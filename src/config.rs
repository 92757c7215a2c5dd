// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Missing or
//! malformed secrets are fatal: the process refuses to start rather than run
//! with a broken encryption key or an unreachable Discord guild.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENCRYPTION_KEY` | AEAD key for wallet addresses (exactly 32 bytes) | Required |
//! | `DISCORD_BOT_TOKEN` | Bot token for role/channel mutations | Required |
//! | `DISCORD_GUILD_ID` | Guild the bot manages | Required |
//! | `SUBSCRIPTION_PROGRAM_ID` | On-chain subscription program address | Required |
//! | `SOLANA_RPC_URL` | Chain RPC endpoint | Devnet |
//! | `WEBHOOK_SECRET` | HMAC secret for the approval webhook | Optional (check skipped) |
//! | `API_KEY` | API key for the approval webhook | Optional (check skipped) |
//! | `RATE_LIMIT_WINDOW_MS` | Fixed rate-limit window | `900000` |
//! | `RATE_LIMIT_MAX_REQUESTS` | Requests allowed per window | `100` |
//! | `ROLE_SYNC_INTERVAL_MS` | Reconciliation timer period | `120000` |
//! | `DATA_DIR` | Root directory for persistent storage | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ENVIRONMENT` | `production` enables generic error messages | `development` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Environment variable name for the 32-byte AEAD key.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

/// Environment variable name for the persistent data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Public Solana devnet endpoint, used when `SOLANA_RPC_URL` is unset.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Configuration errors are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Immutable runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// 32-byte symmetric key for the encryption vault.
    pub encryption_key: [u8; 32],
    /// Discord bot token used for all role/channel mutations.
    pub discord_bot_token: String,
    /// Discord guild (server) the bot manages.
    pub discord_guild_id: String,
    /// On-chain subscription program address (base58).
    pub subscription_program_id: String,
    /// Solana JSON-RPC endpoint.
    pub solana_rpc_url: String,
    /// HMAC secret for approval webhook signatures. `None` disables the check.
    pub webhook_secret: Option<String>,
    /// API key for the approval webhook. `None` disables the check.
    pub api_key: Option<String>,
    /// Fixed rate-limit window in milliseconds.
    pub rate_limit_window_ms: u64,
    /// Requests allowed per identifier per window.
    pub rate_limit_max_requests: u32,
    /// Reconciliation timer period in milliseconds.
    pub role_sync_interval_ms: u64,
    /// Root directory for persistent storage.
    pub data_dir: PathBuf,
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Whether we are running in production (generic error messages).
    pub production: bool,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Fails fast on missing/malformed secrets: the service must not operate
    /// with a bad encryption key or without Discord credentials. Absent
    /// webhook secrets are tolerated but logged loudly, since they disable
    /// the corresponding authentication check on the approval webhook.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key_str = env::var(ENCRYPTION_KEY_ENV)
            .map_err(|_| ConfigError::Missing(ENCRYPTION_KEY_ENV))?;
        let key_bytes = key_str.as_bytes();
        if key_bytes.len() != 32 {
            return Err(ConfigError::Invalid {
                name: ENCRYPTION_KEY_ENV,
                reason: format!("must be exactly 32 bytes, got {}", key_bytes.len()),
            });
        }
        let mut encryption_key = [0u8; 32];
        encryption_key.copy_from_slice(key_bytes);

        let discord_bot_token =
            env::var("DISCORD_BOT_TOKEN").map_err(|_| ConfigError::Missing("DISCORD_BOT_TOKEN"))?;
        let discord_guild_id =
            env::var("DISCORD_GUILD_ID").map_err(|_| ConfigError::Missing("DISCORD_GUILD_ID"))?;
        let subscription_program_id = env::var("SUBSCRIPTION_PROGRAM_ID")
            .map_err(|_| ConfigError::Missing("SUBSCRIPTION_PROGRAM_ID"))?;

        let webhook_secret = env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty());
        if webhook_secret.is_none() {
            warn!("WEBHOOK_SECRET not set: approval webhook signature check is DISABLED");
        }
        let api_key = env::var("API_KEY").ok().filter(|s| !s.is_empty());
        if api_key.is_none() {
            warn!("API_KEY not set: approval webhook API-key check is DISABLED");
        }

        Ok(Self {
            encryption_key,
            discord_bot_token,
            discord_guild_id,
            subscription_program_id,
            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| DEVNET_RPC_URL.to_string()),
            webhook_secret,
            api_key,
            rate_limit_window_ms: parse_env("RATE_LIMIT_WINDOW_MS", 900_000)?,
            rate_limit_max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS", 100)?,
            role_sync_interval_ms: parse_env("ROLE_SYNC_INTERVAL_MS", 120_000)?,
            data_dir: PathBuf::from(env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string())),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            production: env::var("ENVIRONMENT")
                .map(|e| e.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        })
    }
}

/// Parse an optional numeric environment variable, falling back to a default.
///
/// A *present but unparseable* value is a hard error, not a silent fallback.
fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-var tests mutate shared process state; serialize them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_vars() {
        env::set_var(ENCRYPTION_KEY_ENV, "0123456789abcdef0123456789abcdef");
        env::set_var("DISCORD_BOT_TOKEN", "bot-token");
        env::set_var("DISCORD_GUILD_ID", "guild-1");
        env::set_var(
            "SUBSCRIPTION_PROGRAM_ID",
            "Sub1111111111111111111111111111111111111111",
        );
    }

    fn clear_vars() {
        for name in [
            ENCRYPTION_KEY_ENV,
            "DISCORD_BOT_TOKEN",
            "DISCORD_GUILD_ID",
            "SUBSCRIPTION_PROGRAM_ID",
            "SOLANA_RPC_URL",
            "RATE_LIMIT_WINDOW_MS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn missing_encryption_key_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENCRYPTION_KEY_ENV)));
    }

    #[test]
    fn short_encryption_key_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_vars();
        env::set_var(ENCRYPTION_KEY_ENV, "too-short");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name, .. } if name == ENCRYPTION_KEY_ENV));
        clear_vars();
    }

    #[test]
    fn defaults_applied_when_optional_vars_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_vars();
        let config = Config::from_env().unwrap();
        assert_eq!(config.rate_limit_window_ms, 900_000);
        assert_eq!(config.rate_limit_max_requests, 100);
        assert_eq!(config.role_sync_interval_ms, 120_000);
        assert_eq!(config.solana_rpc_url, DEVNET_RPC_URL);
        assert!(!config.production);
        clear_vars();
    }

    #[test]
    fn parse_env_rejects_garbage() {
        env::set_var("ROLESYNC_TEST_NUM", "not-a-number");
        let result: Result<u64, _> = parse_env("ROLESYNC_TEST_NUM", 5);
        assert!(result.is_err());
        env::remove_var("ROLESYNC_TEST_NUM");
    }
}

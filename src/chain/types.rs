// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Subscription types decoded from on-chain account data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription lifecycle state, decoded once at the RPC boundary from the
/// raw on-chain status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    /// Translate the on-chain u8 status code. Unknown codes map to
    /// `Cancelled`: an unrecognized state must never grant access.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Active,
            1 => Self::Expired,
            _ => Self::Cancelled,
        }
    }
}

/// A subscriber's entitlement to one trader channel.
///
/// Ephemeral: recomputed from chain on every reconciliation pass, never
/// cached across passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Logical channel identifier (platform-assigned, stable).
    pub channel_id: String,
    /// Current lifecycle state.
    pub status: SubscriptionStatus,
    /// Expiry, if the subscription is time-bounded.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Whether this subscription currently entitles the holder to access.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

/// Result of the authoritative pre-grant subscription check.
#[derive(Debug, Clone)]
pub struct SubscriptionCheck {
    pub valid: bool,
    pub subscription: Option<Subscription>,
    pub error: Option<String>,
}

impl SubscriptionCheck {
    pub fn valid(subscription: Subscription) -> Self {
        Self {
            valid: true,
            subscription: Some(subscription),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            subscription: None,
            error: Some(error.into()),
        }
    }
}

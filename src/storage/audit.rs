// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Audit logging for verification and role-mutation events.
//!
//! Audit writes are best-effort: a failed write is logged and swallowed,
//! never rolled into the outcome of the operation being audited. Wallet
//! addresses appear only as their SHA-256 lookup hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DataStore, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Verification events
    WalletVerified,
    VerificationRejected,

    // Reconciliation events
    RoleGranted,
    RoleRevoked,
    SyncCompleted,

    // Provisioning events
    ChannelProvisioned,
    ApplicationApproved,

    // Abuse events
    RateLimitBlocked,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Discord user involved (if any).
    pub discord_user_id: Option<String>,
    /// SHA-256 hash of the wallet address involved (never the plaintext).
    pub wallet_hash: Option<String>,
    /// Logical channel involved (if any).
    pub channel_id: Option<String>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            discord_user_id: None,
            wallet_hash: None,
            channel_id: None,
            details: None,
        }
    }

    pub fn with_user(mut self, discord_user_id: impl Into<String>) -> Self {
        self.discord_user_id = Some(discord_user_id.into());
        self
    }

    pub fn with_wallet_hash(mut self, wallet_hash: impl Into<String>) -> Self {
        self.wallet_hash = Some(wallet_hash.into());
        self
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Repository for audit events, appended to daily JSONL files.
pub struct AuditRepository<'a> {
    store: &'a DataStore,
}

impl<'a> AuditRepository<'a> {
    pub fn new(store: &'a DataStore) -> Self {
        Self { store }
    }

    /// Append an audit event to today's log file.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.store.paths().audit_events_file(&date);

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.store.append_raw(&path, &line)
    }

    /// Read audit events for a specific date.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.store.paths().audit_events_file(date);
        let content = self.store.read_raw(&path)?;

        let mut events = Vec::new();
        for line in content.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            let event: AuditEvent = serde_json::from_slice(line)?;
            events.push(event);
        }
        Ok(events)
    }
}

/// Log an audit event, swallowing (but tracing) failures.
///
/// Audit writes must never fail the operation being audited.
pub fn audit_best_effort(store: &DataStore, event: AuditEvent) {
    let repo = AuditRepository::new(store);
    if let Err(e) = repo.log(&event) {
        tracing::warn!(error = %e, event_type = ?event.event_type, "audit write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DataStore) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut store = DataStore::new(paths);
        store.initialize().unwrap();
        (temp, store)
    }

    #[test]
    fn builder_sets_fields() {
        let event = AuditEvent::new(AuditEventType::WalletVerified)
            .with_user("user-1")
            .with_wallet_hash("abc123")
            .with_channel("ch-1");

        assert_eq!(event.event_type, AuditEventType::WalletVerified);
        assert_eq!(event.discord_user_id, Some("user-1".to_string()));
        assert_eq!(event.wallet_hash, Some("abc123".to_string()));
        assert_eq!(event.channel_id, Some("ch-1".to_string()));
    }

    #[test]
    fn log_and_read_events() {
        let (_temp, store) = setup();
        let repo = AuditRepository::new(&store);

        repo.log(&AuditEvent::new(AuditEventType::WalletVerified).with_user("u1"))
            .unwrap();
        repo.log(&AuditEvent::new(AuditEventType::RoleGranted).with_user("u2"))
            .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = repo.read_events(&today).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::WalletVerified);
        assert_eq!(events[1].event_type, AuditEventType::RoleGranted);
    }

    #[test]
    fn best_effort_logging_never_panics() {
        // Uninitialized store: the write fails, the call must not.
        let store = DataStore::new(StoragePaths::new("/tmp/never-init-audit"));
        audit_best_effort(&store, AuditEvent::new(AuditEventType::RateLimitBlocked));
    }
}

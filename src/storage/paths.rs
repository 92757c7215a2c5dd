// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Path layout for persistent storage.

use std::path::{Path, PathBuf};

/// Default base directory for persistent state.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persistent data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Wallet Verification Paths ==========

    /// Directory containing all wallet verification records.
    pub fn verifications_dir(&self) -> PathBuf {
        self.root.join("verifications")
    }

    /// Path to a verification record, keyed by Discord user id.
    ///
    /// One file per user id is what enforces the at-most-one-row invariant:
    /// re-verification rewrites the same file in place.
    pub fn verification(&self, discord_user_id: &str) -> PathBuf {
        self.verifications_dir()
            .join(format!("{discord_user_id}.json"))
    }

    // ========== Channel Mapping Paths ==========

    /// Directory containing all channel-role mappings.
    pub fn channels_dir(&self) -> PathBuf {
        self.root.join("channels")
    }

    /// Path to a channel mapping, keyed by logical channel id.
    pub fn channel(&self, channel_id: &str) -> PathBuf {
        self.channels_dir().join(format!("{channel_id}.json"))
    }

    // ========== Application Approval Paths ==========

    /// Directory containing application approval records.
    pub fn approvals_dir(&self) -> PathBuf {
        self.root.join("approvals")
    }

    /// Path to an approval record.
    pub fn approval(&self, approval_id: &str) -> PathBuf {
        self.approvals_dir().join(format!("{approval_id}.json"))
    }

    // ========== Rate Limit Paths ==========

    /// Path to the embedded rate-limit database.
    pub fn ratelimit_db(&self) -> PathBuf {
        self.root.join("ratelimit.redb")
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_dir().join(format!("{date}.jsonl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("/data"));
    }

    #[test]
    fn verification_paths_are_keyed_by_user_id() {
        let paths = StoragePaths::new("/tmp/test-data");
        assert_eq!(
            paths.verification("123456789"),
            PathBuf::from("/tmp/test-data/verifications/123456789.json")
        );
    }

    #[test]
    fn channel_and_approval_paths() {
        let paths = StoragePaths::new("/tmp/test-data");
        assert_eq!(
            paths.channel("ch-42"),
            PathBuf::from("/tmp/test-data/channels/ch-42.json")
        );
        assert_eq!(
            paths.approval("ap-1"),
            PathBuf::from("/tmp/test-data/approvals/ap-1.json")
        );
        assert_eq!(
            paths.ratelimit_db(),
            PathBuf::from("/tmp/test-data/ratelimit.redb")
        );
    }

    #[test]
    fn audit_paths_are_daily_files() {
        let paths = StoragePaths::new("/tmp/test-data");
        assert_eq!(
            paths.audit_events_file("2026-08-30"),
            PathBuf::from("/tmp/test-data/audit/2026-08-30.jsonl")
        );
    }
}

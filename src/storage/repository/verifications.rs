// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Repository for verified-wallet records.
//!
//! ## Storage Layout
//!
//! One JSON file per Discord user id:
//! ```text
//! /data/verifications/{discord_user_id}.json
//! ```
//!
//! The filename *is* the unique key, so re-verification rewrites the record
//! in place and concurrent upserts for the same user collapse to a single
//! file via the store's atomic rename. The wallet address is stored only as
//! an encrypted envelope plus its SHA-256 lookup hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{DataStore, StorageError, StorageResult};

/// A wallet whose ownership has been cryptographically proven by the
/// connected Discord user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletVerification {
    /// Discord user id, the unique key.
    pub discord_user_id: String,
    /// Base64-encoded AEAD envelope of the wallet address.
    pub wallet_address_encrypted: String,
    /// SHA-256 hex digest of the plaintext address (lookup/audit key).
    pub wallet_address_hash: String,
    /// The signed challenge, retained for audit.
    pub signature_proof: String,
    /// The challenge message, retained for audit.
    pub verification_message: String,
    /// Timestamp of the last (re)verification.
    pub verified_at: DateTime<Utc>,
    /// Timestamp of the first verification; preserved across upserts.
    pub created_at: DateTime<Utc>,
}

/// Repository for wallet verification records.
pub struct VerificationRepository<'a> {
    store: &'a DataStore,
}

impl<'a> VerificationRepository<'a> {
    pub fn new(store: &'a DataStore) -> Self {
        Self { store }
    }

    /// Check if a verification exists for a Discord user.
    pub fn exists(&self, discord_user_id: &str) -> bool {
        self.store
            .exists(self.store.paths().verification(discord_user_id))
    }

    /// Get a verification record by Discord user id.
    pub fn get(&self, discord_user_id: &str) -> StorageResult<WalletVerification> {
        let path = self.store.paths().verification(discord_user_id);
        if !self.store.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "verification for user {discord_user_id}"
            )));
        }
        self.store.read_json(path)
    }

    /// Insert or update the verification for a Discord user.
    ///
    /// Re-verification overwrites in place (never appends); `created_at` of
    /// an existing record is preserved.
    pub fn upsert(&self, mut record: WalletVerification) -> StorageResult<WalletVerification> {
        if let Ok(existing) = self.get(&record.discord_user_id) {
            record.created_at = existing.created_at;
        }
        self.store
            .write_json(self.store.paths().verification(&record.discord_user_id), &record)?;
        Ok(record)
    }

    /// List all verification records, in storage order.
    ///
    /// Processing order carries no semantic weight for the reconciler.
    pub fn list_all(&self) -> StorageResult<Vec<WalletVerification>> {
        let ids = self
            .store
            .list_files(self.store.paths().verifications_dir(), "json")?;

        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get(id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(discord_user_id = %id, error = %e, "skipping unreadable verification record");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DataStore) {
        let temp = TempDir::new().unwrap();
        let mut store = DataStore::new(StoragePaths::new(temp.path()));
        store.initialize().unwrap();
        (temp, store)
    }

    fn sample(discord_user_id: &str) -> WalletVerification {
        WalletVerification {
            discord_user_id: discord_user_id.to_string(),
            wallet_address_encrypted: "ZW52ZWxvcGU=".to_string(),
            wallet_address_hash: "ab".repeat(32),
            signature_proof: "c2ln".to_string(),
            verification_message: "Verify wallet for user".to_string(),
            verified_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_and_get() {
        let (_temp, store) = setup();
        let repo = VerificationRepository::new(&store);

        repo.upsert(sample("user-1")).unwrap();
        let loaded = repo.get("user-1").unwrap();
        assert_eq!(loaded.discord_user_id, "user-1");
    }

    #[test]
    fn reverification_overwrites_in_place_and_keeps_created_at() {
        let (_temp, store) = setup();
        let repo = VerificationRepository::new(&store);

        let first = repo.upsert(sample("user-1")).unwrap();

        let mut second = sample("user-1");
        second.wallet_address_hash = "cd".repeat(32);
        let stored = repo.upsert(second).unwrap();

        assert_eq!(stored.created_at, first.created_at);

        // Still exactly one record for the user
        assert_eq!(repo.list_all().unwrap().len(), 1);
        assert_eq!(repo.get("user-1").unwrap().wallet_address_hash, "cd".repeat(32));
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_temp, store) = setup();
        let repo = VerificationRepository::new(&store);
        assert!(matches!(
            repo.get("ghost"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn list_all_returns_every_record() {
        let (_temp, store) = setup();
        let repo = VerificationRepository::new(&store);
        for i in 1..=3 {
            repo.upsert(sample(&format!("user-{i}"))).unwrap();
        }
        assert_eq!(repo.list_all().unwrap().len(), 3);
    }
}

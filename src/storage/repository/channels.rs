// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Repository for channel-role mappings.
//!
//! One JSON file per logical channel id under `/data/channels/`. Upsert on
//! conflict: re-provisioning a channel updates the Discord ids rather than
//! duplicating the mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{DataStore, StorageError, StorageResult};

/// Mapping from a trader's subscription channel to its Discord role and
/// text channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMapping {
    /// Logical channel identifier (platform-assigned, stable), the unique key.
    pub channel_id: String,
    /// The trader's on-chain address. Public-facing, stored in plaintext.
    pub trader_wallet: String,
    /// Discord role gating access to the channel.
    pub discord_role_id: String,
    /// Discord text channel backing the subscription room.
    pub discord_channel_id: String,
    /// Human-readable channel name.
    pub channel_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for channel-role mappings.
pub struct ChannelRepository<'a> {
    store: &'a DataStore,
}

impl<'a> ChannelRepository<'a> {
    pub fn new(store: &'a DataStore) -> Self {
        Self { store }
    }

    pub fn exists(&self, channel_id: &str) -> bool {
        self.store.exists(self.store.paths().channel(channel_id))
    }

    pub fn get(&self, channel_id: &str) -> StorageResult<ChannelMapping> {
        let path = self.store.paths().channel(channel_id);
        if !self.store.exists(&path) {
            return Err(StorageError::NotFound(format!("channel {channel_id}")));
        }
        self.store.read_json(path)
    }

    /// Insert or update the mapping for a channel id.
    ///
    /// On conflict the Discord ids and `updated_at` change; `created_at`
    /// of the existing mapping is preserved.
    pub fn upsert(&self, mut mapping: ChannelMapping) -> StorageResult<ChannelMapping> {
        if let Ok(existing) = self.get(&mapping.channel_id) {
            mapping.created_at = existing.created_at;
        }
        mapping.updated_at = Utc::now();
        self.store
            .write_json(self.store.paths().channel(&mapping.channel_id), &mapping)?;
        Ok(mapping)
    }

    /// List all mappings, in storage order.
    pub fn list_all(&self) -> StorageResult<Vec<ChannelMapping>> {
        let ids = self
            .store
            .list_files(self.store.paths().channels_dir(), "json")?;

        let mut mappings = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get(id) {
                Ok(mapping) => mappings.push(mapping),
                Err(e) => {
                    tracing::warn!(channel_id = %id, error = %e, "skipping unreadable channel mapping");
                }
            }
        }
        Ok(mappings)
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

    fn sample(channel_id: &str) -> ChannelMapping {
        ChannelMapping {
            channel_id: channel_id.to_string(),
            trader_wallet: "Trader111111111111111111111111111111111111".to_string(),
            discord_role_id: "role-1".to_string(),
            discord_channel_id: "chan-1".to_string(),
            channel_name: "Momentum Signals".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_and_get() {
        let (_temp, store) = setup();
        let repo = ChannelRepository::new(&store);
        repo.upsert(sample("ch-1")).unwrap();
        assert_eq!(repo.get("ch-1").unwrap().channel_name, "Momentum Signals");
    }

    #[test]
    fn upsert_on_conflict_updates_discord_ids() {
        let (_temp, store) = setup();
        let repo = ChannelRepository::new(&store);

        let first = repo.upsert(sample("ch-1")).unwrap();

        let mut reprovisioned = sample("ch-1");
        reprovisioned.discord_role_id = "role-2".to_string();
        reprovisioned.discord_channel_id = "chan-2".to_string();
        let stored = repo.upsert(reprovisioned).unwrap();

        assert_eq!(stored.created_at, first.created_at);
        assert!(stored.updated_at >= first.updated_at);

        let loaded = repo.get("ch-1").unwrap();
        assert_eq!(loaded.discord_role_id, "role-2");
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn list_all_returns_every_mapping() {
        let (_temp, store) = setup();
        let repo = ChannelRepository::new(&store);
        for i in 1..=4 {
            repo.upsert(sample(&format!("ch-{i}"))).unwrap();
        }
        assert_eq!(repo.list_all().unwrap().len(), 4);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Repository for application-approval records.
//!
//! The approval webhook persists each approved application before
//! provisioning its Discord role and channel, so a provisioning failure can
//! be retried from the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{DataStore, StorageResult};

/// An approved trader application, as delivered by the approval webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationApproval {
    /// Unique approval record id.
    pub approval_id: String,
    /// Logical channel id assigned by the platform.
    pub channel_id: String,
    /// The trader's on-chain address.
    pub trader_wallet: String,
    /// Requested channel name.
    pub channel_name: String,
    /// Maximum member count, if the platform caps it.
    pub max_members: Option<u32>,
    /// Subscription price in the platform's quote currency.
    pub subscription_price: Option<f64>,
    /// Whether provisioning succeeded.
    pub provisioned: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository for application approvals.
pub struct ApprovalRepository<'a> {
    store: &'a DataStore,
}

impl<'a> ApprovalRepository<'a> {
    pub fn new(store: &'a DataStore) -> Self {
        Self { store }
    }

    /// Persist a new approval record.
    pub fn create(&self, approval: &ApplicationApproval) -> StorageResult<()> {
        self.store
            .write_json(self.store.paths().approval(&approval.approval_id), approval)
    }

    /// Mark an approval as provisioned.
    pub fn mark_provisioned(&self, approval_id: &str) -> StorageResult<()> {
        let path = self.store.paths().approval(approval_id);
        let mut approval: ApplicationApproval = self.store.read_json(&path)?;
        approval.provisioned = true;
        self.store.write_json(&path, &approval)
    }

    /// List all approval records.
    pub fn list_all(&self) -> StorageResult<Vec<ApplicationApproval>> {
        let ids = self
            .store
            .list_files(self.store.paths().approvals_dir(), "json")?;

        let mut approvals = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Ok(approval) = self.store.read_json(self.store.paths().approval(id)) {
                approvals.push(approval);
            }
        }
        Ok(approvals)
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

    fn sample() -> ApplicationApproval {
        ApplicationApproval {
            approval_id: "ap-1".to_string(),
            channel_id: "ch-1".to_string(),
            trader_wallet: "Trader111111111111111111111111111111111111".to_string(),
            channel_name: "Momentum Signals".to_string(),
            max_members: Some(50),
            subscription_price: Some(9.99),
            provisioned: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_mark_provisioned() {
        let (_temp, store) = setup();
        let repo = ApprovalRepository::new(&store);

        repo.create(&sample()).unwrap();
        repo.mark_provisioned("ap-1").unwrap();

        let approvals = repo.list_all().unwrap();
        assert_eq!(approvals.len(), 1);
        assert!(approvals[0].provisioned);
    }
}

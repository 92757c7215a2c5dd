// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! # Persistent Storage
//!
//! File-backed JSON records plus an embedded redb database for rate-limit
//! counters. The store is the single source of truth: no component caches
//! subscription or role state across reconciliation passes.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   verifications/{discord_user_id}.json   # encrypted wallet records
//!   channels/{channel_id}.json             # channel-role mappings
//!   approvals/{approval_id}.json           # approved applications
//!   audit/{date}.jsonl                     # daily audit logs
//!   ratelimit.redb                         # fixed-window counters
//! ```

pub mod audit;
pub mod paths;
pub mod repository;
pub mod store;

pub use audit::{audit_best_effort, AuditEvent, AuditEventType, AuditRepository};
pub use paths::StoragePaths;
pub use repository::{
    ApplicationApproval, ApprovalRepository, ChannelMapping, ChannelRepository,
    VerificationRepository, WalletVerification,
};
pub use store::{DataStore, StorageError, StorageResult};

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Fixed-window rate limiter backed by an embedded redb table.
//!
//! ## State machine per `(identifier, endpoint)`
//!
//! ```text
//! Unseen → Counting → Blocked → (window expiry) → Unseen
//! ```
//!
//! Every check first purges *all* records whose window has fully elapsed.
//! The purge is global, not scoped to the key being checked. A record is
//! blocking iff `blocked_until` is set and in the future.
//!
//! Check-then-act against shared state is inherently racy across processes;
//! the consequence (slightly over-admitting near the boundary) is accepted.
//! Within one process, redb's single-writer transactions serialize checks.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

/// `identifier|endpoint` → serialized [`RateLimitRecord`] (JSON bytes).
const RATE_LIMITS: TableDefinition<&str, &[u8]> = TableDefinition::new("rate_limits");

/// Default fixed window: 15 minutes.
pub const DEFAULT_WINDOW_MS: u64 = 900_000;

/// Default allowance per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Persisted per-key window state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateLimitRecord {
    /// Requests seen in the current window.
    attempts: u32,
    /// Window start, unix milliseconds.
    window_start: i64,
    /// If set and in the future, the key is blocked until this instant.
    blocked_until: Option<i64>,
}

/// Outcome of a rate-limit check, including header values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// `X-RateLimit-Limit`.
    pub limit: u32,
    /// `X-RateLimit-Remaining`.
    pub remaining: u32,
    /// `X-RateLimit-Reset`, unix milliseconds.
    pub reset_at_ms: i64,
}

/// Fixed-window counter store over redb.
pub struct RateLimiter {
    db: Database,
    window_ms: u64,
    max_requests: u32,
}

impl RateLimiter {
    /// Open (or create) the limiter database at the given path.
    pub fn open(path: &Path, window_ms: u64, max_requests: u32) -> RateLimitResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RATE_LIMITS)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            window_ms,
            max_requests,
        })
    }

    /// Check and count a request for `(identifier, endpoint)` at the current
    /// wall-clock instant.
    pub fn check(&self, identifier: &str, endpoint: &str) -> RateLimitResult<RateLimitDecision> {
        self.check_at(identifier, endpoint, chrono::Utc::now().timestamp_millis())
    }

    /// Clock-injected form of [`RateLimiter::check`].
    fn check_at(
        &self,
        identifier: &str,
        endpoint: &str,
        now_ms: i64,
    ) -> RateLimitResult<RateLimitDecision> {
        let key = format!("{identifier}|{endpoint}");
        let window_ms = self.window_ms as i64;

        let write_txn = self.db.begin_write()?;
        let decision = {
            let mut table = write_txn.open_table(RATE_LIMITS)?;

            // Global lazy purge: drop every fully-elapsed window.
            let mut expired: Vec<String> = Vec::new();
            for entry in table.iter()? {
                let (k, v) = entry?;
                if let Ok(record) = serde_json::from_slice::<RateLimitRecord>(v.value()) {
                    if record.window_start < now_ms - window_ms {
                        expired.push(k.value().to_string());
                    }
                }
            }
            for k in &expired {
                table.remove(k.as_str())?;
            }

            let existing = table
                .get(key.as_str())?
                .map(|v| serde_json::from_slice::<RateLimitRecord>(v.value()))
                .transpose()?;

            match existing {
                // Blocked and the block has not lifted: reject outright.
                Some(record)
                    if record.blocked_until.is_some_and(|until| until > now_ms) =>
                {
                    RateLimitDecision {
                        allowed: false,
                        limit: self.max_requests,
                        remaining: 0,
                        reset_at_ms: record.blocked_until.unwrap_or(now_ms),
                    }
                }

                // Counting and the allowance is spent: transition to Blocked.
                Some(mut record) if record.attempts >= self.max_requests => {
                    let blocked_until = record.window_start + window_ms;
                    record.attempts += 1;
                    record.blocked_until = Some(blocked_until);
                    table.insert(key.as_str(), serde_json::to_vec(&record)?.as_slice())?;
                    RateLimitDecision {
                        allowed: false,
                        limit: self.max_requests,
                        remaining: 0,
                        reset_at_ms: blocked_until,
                    }
                }

                // Counting with allowance left: take one.
                Some(mut record) => {
                    record.attempts += 1;
                    table.insert(key.as_str(), serde_json::to_vec(&record)?.as_slice())?;
                    RateLimitDecision {
                        allowed: true,
                        limit: self.max_requests,
                        remaining: self.max_requests - record.attempts,
                        reset_at_ms: record.window_start + window_ms,
                    }
                }

                // Unseen: open a fresh window.
                None => {
                    let record = RateLimitRecord {
                        attempts: 1,
                        window_start: now_ms,
                        blocked_until: None,
                    };
                    table.insert(key.as_str(), serde_json::to_vec(&record)?.as_slice())?;
                    RateLimitDecision {
                        allowed: true,
                        limit: self.max_requests,
                        remaining: self.max_requests - 1,
                        reset_at_ms: now_ms + window_ms,
                    }
                }
            }
        };
        write_txn.commit()?;
        Ok(decision)
    }

    /// Number of live records.
    #[cfg(test)]
    fn record_count(&self) -> RateLimitResult<usize> {
        use redb::ReadableDatabase;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RATE_LIMITS)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_limiter(window_ms: u64, max_requests: u32) -> (RateLimiter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let limiter =
            RateLimiter::open(&dir.path().join("rl.redb"), window_ms, max_requests).unwrap();
        (limiter, dir)
    }

    #[test]
    fn boundary_three_allowed_then_blocked() {
        let (limiter, _dir) = temp_limiter(1000, 3);
        let now = 1_000_000;

        let results: Vec<bool> = (0..4)
            .map(|i| limiter.check_at("ip-1", "verify", now + i).unwrap().allowed)
            .collect();
        assert_eq!(results, vec![true, true, true, false]);
    }

    #[test]
    fn remaining_counts_down() {
        let (limiter, _dir) = temp_limiter(1000, 3);
        let now = 1_000_000;

        assert_eq!(limiter.check_at("ip-1", "verify", now).unwrap().remaining, 2);
        assert_eq!(limiter.check_at("ip-1", "verify", now).unwrap().remaining, 1);
        assert_eq!(limiter.check_at("ip-1", "verify", now).unwrap().remaining, 0);
        let denied = limiter.check_at("ip-1", "verify", now).unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at_ms, now + 1000);
    }

    #[test]
    fn blocked_until_window_expiry_then_fresh() {
        let (limiter, _dir) = temp_limiter(1000, 2);
        let start = 1_000_000;

        assert!(limiter.check_at("ip-1", "verify", start).unwrap().allowed);
        assert!(limiter.check_at("ip-1", "verify", start + 1).unwrap().allowed);
        assert!(!limiter.check_at("ip-1", "verify", start + 2).unwrap().allowed);
        // Still inside the window: remains blocked.
        assert!(!limiter.check_at("ip-1", "verify", start + 999).unwrap().allowed);
        // Window fully elapsed: record purged, fresh window begins.
        let fresh = limiter.check_at("ip-1", "verify", start + 2001).unwrap();
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);
    }

    #[test]
    fn keys_are_isolated() {
        let (limiter, _dir) = temp_limiter(1000, 1);
        let now = 1_000_000;

        assert!(limiter.check_at("ip-1", "verify", now).unwrap().allowed);
        assert!(!limiter.check_at("ip-1", "verify", now + 1).unwrap().allowed);
        // Different identifier, same endpoint: unaffected.
        assert!(limiter.check_at("ip-2", "verify", now + 2).unwrap().allowed);
        // Same identifier, different endpoint: unaffected.
        assert!(limiter.check_at("ip-1", "webhook", now + 3).unwrap().allowed);
    }

    #[test]
    fn purge_is_global_not_per_key() {
        let (limiter, _dir) = temp_limiter(1000, 5);
        let start = 1_000_000;

        limiter.check_at("ip-1", "verify", start).unwrap();
        limiter.check_at("ip-2", "verify", start).unwrap();
        assert_eq!(limiter.record_count().unwrap(), 2);

        // A check for a third key after both windows elapsed purges them.
        limiter.check_at("ip-3", "verify", start + 5000).unwrap();
        assert_eq!(limiter.record_count().unwrap(), 1);
    }
}

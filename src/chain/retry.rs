// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Bounded retry wrapper for chain RPC calls.
//!
//! Every chain operation inside a reconciliation pass goes through
//! [`with_retry`] so a flaky RPC call degrades to "skip this unit of work"
//! instead of aborting the pass. Exhaustion returns `None` and logs; errors
//! never propagate past this boundary.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Default number of attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Execute `operation` with linear backoff: attempt n waits `base_delay * n`
/// before retrying. Linear rather than exponential: chain RPC hiccups here
/// are short-lived and the whole pass should not stall for minutes.
pub async fn with_retry<F, Fut, T, E>(
    label: &str,
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => return Some(value),
            Err(e) => {
                warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    error = %e,
                    "chain operation failed"
                );
                if attempt < max_attempts {
                    tokio::time::sleep(base_delay * attempt).await;
                }
            }
        }
    }
    warn!(operation = label, max_attempts, "chain operation exhausted retries");
    None
}

/// [`with_retry`] with the default attempt count and delay schedule.
pub async fn with_default_retry<F, Fut, T, E>(label: &str, operation: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry(label, DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", 3, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(42) }
        })
        .await;
        assert_eq!(result, Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", 3, Duration::ZERO, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_none() {
        let calls = AtomicU32::new(0);
        let result: Option<u32> = with_retry("test", 3, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>("down".to_string()) }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

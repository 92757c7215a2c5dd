// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Chain query layer: subscription lookups, signature verification, retry.

pub mod client;
pub mod retry;
pub mod signature;
pub mod types;

pub use client::{ChainError, ChainQuery, SolanaRpcClient};
pub use retry::{with_default_retry, with_retry};
pub use signature::{is_valid_address_shape, verify_signature};
pub use types::{Subscription, SubscriptionCheck, SubscriptionStatus};

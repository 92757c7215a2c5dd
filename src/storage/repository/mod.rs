// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

pub mod approvals;
pub mod channels;
pub mod verifications;

pub use approvals::{ApplicationApproval, ApprovalRepository};
pub use channels::{ChannelMapping, ChannelRepository};
pub use verifications::{VerificationRepository, WalletVerification};

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Ed25519 wallet-ownership signature gate.
//!
//! Verification is a boolean gate, not an exceptional path: malformed keys,
//! signatures, or encodings all verify `false`, never error. The caller only
//! learns "valid" or "invalid".

use base64ct::{Base64, Encoding};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Verify a detached Ed25519 signature over the UTF-8 message bytes.
///
/// `address` is the claimed base58 public key; `signature_b64` the base64
/// detached signature.
pub fn verify_signature(address: &str, message: &str, signature_b64: &str) -> bool {
    let Ok(key_bytes) = bs58::decode(address).into_vec() else {
        return false;
    };
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_array) else {
        return false;
    };

    let Ok(sig_bytes) = Base64::decode_vec(signature_b64) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };

    verifying_key.verify(message.as_bytes(), &signature).is_ok()
}

/// Shape check for a base58 Solana-style address: 32-44 characters from the
/// base58 alphabet. Cheap pre-filter before any cryptographic work.
pub fn is_valid_address_shape(address: &str) -> bool {
    (32..=44).contains(&address.len())
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

//! Encryption vault for wallet addresses at rest.
//!
//! Addresses are sealed with AES-256-GCM under a single process-wide key.
//! The ciphertext envelope is `salt(64) || iv(16) || tag(16) || ciphertext`.
//! The salt is generated and carried but not yet used for key derivation;
//! it is reserved for a future move to per-record keys.
//!
//! A tag-verification failure on decrypt means tampering or a key mismatch
//! and is surfaced as [`VaultError::Integrity`]; callers must never treat
//! it as "no data".

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// AES-256-GCM with a 16-byte IV (envelope format compatibility).
type Cipher = AesGcm<Aes256, U16>;

const SALT_LEN: usize = 64;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Envelope too short or otherwise structurally invalid.
    #[error("malformed ciphertext envelope: {0}")]
    Malformed(String),

    /// Authentication tag did not verify: tampering or wrong key.
    #[error("ciphertext integrity check failed (tampered data or wrong key)")]
    Integrity,

    /// Decrypted bytes were not valid UTF-8.
    #[error("decrypted plaintext is not valid UTF-8")]
    InvalidPlaintext,
}

/// Symmetric vault holding the process-wide 32-byte key.
///
/// The key is validated at configuration load; constructing a vault from a
/// [`crate::config::Config`] therefore cannot fail.
#[derive(Clone)]
pub struct Vault {
    key: [u8; 32],
}

impl Vault {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Encrypt a plaintext address into a sealed envelope.
    pub fn encrypt(&self, plaintext: &str) -> Vec<u8> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let cipher = Cipher::new(GenericArray::from_slice(&self.key));
        let nonce = GenericArray::from_slice(&iv);
        // Aead::encrypt over a fresh random nonce cannot fail for AES-GCM.
        let mut ct_and_tag = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .expect("AES-GCM encryption is infallible with a valid key");

        // aes-gcm appends the tag to the ciphertext; the envelope carries it
        // in the header instead.
        let tag_start = ct_and_tag.len() - TAG_LEN;
        let tag: Vec<u8> = ct_and_tag.split_off(tag_start);
        let ciphertext = ct_and_tag;

        let mut envelope = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        envelope.extend_from_slice(&salt);
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&tag);
        envelope.extend_from_slice(&ciphertext);
        envelope
    }

    /// Decrypt an envelope produced by [`Vault::encrypt`].
    pub fn decrypt(&self, envelope: &[u8]) -> Result<String, VaultError> {
        if envelope.len() < HEADER_LEN {
            return Err(VaultError::Malformed(format!(
                "envelope is {} bytes, need at least {HEADER_LEN}",
                envelope.len()
            )));
        }

        let iv = &envelope[SALT_LEN..SALT_LEN + IV_LEN];
        let tag = &envelope[SALT_LEN + IV_LEN..HEADER_LEN];
        let ciphertext = &envelope[HEADER_LEN..];

        let mut ct_and_tag = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        ct_and_tag.extend_from_slice(ciphertext);
        ct_and_tag.extend_from_slice(tag);

        let cipher = Cipher::new(GenericArray::from_slice(&self.key));
        let nonce = GenericArray::from_slice(iv);
        let plaintext = cipher
            .decrypt(nonce, ct_and_tag.as_slice())
            .map_err(|_| VaultError::Integrity)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::InvalidPlaintext)
    }

    /// Deterministic SHA-256 hex digest of a plaintext address.
    ///
    /// Intentionally unsalted: this is a lookup/audit key, not a password
    /// hash. Equal addresses always produce equal digests.
    pub fn hash(plaintext: &str) -> String {
        let digest = Sha256::digest(plaintext.as_bytes());
        hex::encode(digest)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

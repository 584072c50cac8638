//! The self-describing text format for an encrypted field.
//!
//! ```text
//! base64_std( salt[16] || nonce[12] || ciphertext[n] || tag[16] )
//! ```
//!
//! The salt feeds Argon2id to rederive the key, the nonce and the
//! ciphertext-with-tag feed ChaCha20-Poly1305. Only the master key is needed
//! besides the blob itself. The format is closed: the same engine writes
//! and reads it, and there is no version byte or algorithm negotiation.

use crate::cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{SALT_SIZE, Salt};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest decoded blob: salt, nonce and the tag of an empty plaintext.
pub const MIN_SEALED_LEN: usize = SALT_SIZE + NONCE_SIZE + TAG_SIZE;

/// A base64 string holding salt, nonce, ciphertext and tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedBlob(String);

impl SealedBlob {
    /// Packs a salt and AEAD output into the wire format.
    pub fn seal(salt: &Salt, data: &EncryptedData) -> Self {
        let mut raw = Vec::with_capacity(SALT_SIZE + data.len());
        raw.extend_from_slice(salt.as_bytes());
        raw.extend_from_slice(&data.nonce);
        raw.extend_from_slice(&data.ciphertext);
        Self(STANDARD.encode(raw))
    }

    /// Wraps an existing string without validating it. Parsing happens on open.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Splits the blob back into its salt and AEAD parts.
    pub fn open_parts(&self) -> CryptoResult<(Salt, EncryptedData)> {
        let raw = STANDARD
            .decode(self.0.trim())
            .map_err(|e| CryptoError::Encoding(format!("sealed blob is not base64: {e}")))?;

        if raw.len() < MIN_SEALED_LEN {
            return Err(CryptoError::Structural {
                minimum: MIN_SEALED_LEN,
                actual: raw.len(),
            });
        }

        let (salt_bytes, rest) = raw.split_at(SALT_SIZE);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(salt_bytes);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);

        Ok((
            Salt::from_bytes(salt),
            EncryptedData {
                nonce,
                ciphertext: ciphertext.to_vec(),
            },
        ))
    }
}

impl fmt::Display for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SealedBlob> for String {
    fn from(blob: SealedBlob) -> Self {
        blob.0
    }
}

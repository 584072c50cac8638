//! Encryption layer for ReadLater.
//!
//! Provides per-user content encryption using:
//! - Argon2id to derive a fresh key per encryption from the user's master key
//! - ChaCha20-Poly1305 for authenticated encryption
//! - Zeroization of all key material on drop
//!
//! # Architecture
//!
//! Every user owns one random 256-bit **master key**, held by the account
//! subsystem and passed in per call. It never touches data directly:
//!
//! 1. Each encryption draws a random 16-byte salt and derives a one-off
//!    key from (master key, salt) with Argon2id.
//! 2. The plaintext is sealed under that key with a random 12-byte nonce.
//! 3. Salt, nonce, ciphertext and tag are packed into one base64
//!    [`SealedBlob`], so decryption needs only the blob and the master key.
//!
//! A wrong key, a flipped bit or a truncated blob all fail tag verification
//! and surface as [`CryptoError::Authentication`]; partial plaintext is
//! never returned.

mod cipher;
mod encryptor;
mod engine;
mod error;
mod key;
mod sealed;

pub use cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE, decrypt, encrypt};
pub use encryptor::FieldEncryptor;
pub use engine::EncryptionEngine;
pub use error::{CryptoError, CryptoResult};
pub use key::{DerivedKey, KEY_SIZE, KdfParams, MasterKey, SALT_SIZE, Salt, derive_key};
pub use sealed::{MIN_SEALED_LEN, SealedBlob};

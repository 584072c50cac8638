//! Error types for the encryption engine.

use thiserror::Error;

/// Result type for encryption operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced while deriving keys or sealing/opening content.
///
/// Each variant is a distinct failure kind. Callers rely on telling
/// [`CryptoError::Authentication`] (wrong key or tampered data) apart from
/// the others, so none of them is ever folded into another.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Input was not valid base64, or decrypted text was not UTF-8.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Master key or salt could not be decoded, or Argon2 rejected its inputs.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The authentication tag did not verify.
    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    /// A sealed blob was too short to contain salt, nonce and tag.
    #[error("sealed blob too short: need at least {minimum} bytes, got {actual}")]
    Structural { minimum: usize, actual: usize },

    /// Raw key material had the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The cipher refused to encrypt.
    #[error("encryption failed: {0}")]
    Encryption(String),
}

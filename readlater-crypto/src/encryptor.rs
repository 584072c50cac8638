//! Abstract field encryption interface for the content store.
//!
//! The store depends on `Arc<dyn FieldEncryptor>` and never sees derived
//! keys or blob internals. [`EncryptionEngine`] is the real implementation.

use crate::engine::EncryptionEngine;
use crate::error::CryptoResult;
use crate::key::MasterKey;
use crate::sealed::SealedBlob;

/// Seals and opens individual text fields under a caller-supplied master key.
pub trait FieldEncryptor: Send + Sync {
    /// Encrypt `plaintext`, returning the sealed blob as text.
    fn seal_text(&self, plaintext: &str, key: &MasterKey) -> CryptoResult<String>;

    /// Decrypt text previously produced by `seal_text`.
    fn open_text(&self, sealed: &str, key: &MasterKey) -> CryptoResult<String>;
}

impl FieldEncryptor for EncryptionEngine {
    fn seal_text(&self, plaintext: &str, key: &MasterKey) -> CryptoResult<String> {
        self.encrypt_string(plaintext, key).map(SealedBlob::into_string)
    }

    fn open_text(&self, sealed: &str, key: &MasterKey) -> CryptoResult<String> {
        self.decrypt_string(&SealedBlob::from_encoded(sealed), key)
    }
}

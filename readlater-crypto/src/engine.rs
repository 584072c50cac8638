//! The encryption engine: master key in, self-describing sealed blob out.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KdfParams, MasterKey, Salt, derive_key};
use crate::sealed::SealedBlob;

/// Stateless encryption engine configured with an Argon2id work factor.
///
/// Construct one per process from configuration and share it by cloning;
/// there is no global instance. Every [`encrypt`](Self::encrypt) call draws
/// a fresh salt and nonce, so sealing the same plaintext twice yields two
/// unrelated blobs.
#[derive(Clone, Debug, Default)]
pub struct EncryptionEngine {
    params: KdfParams,
}

impl EncryptionEngine {
    /// Creates an engine after validating `params`.
    pub fn new(params: KdfParams) -> CryptoResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Generates a new per-user master key in its base64 text form.
    pub fn generate_user_key(&self) -> String {
        MasterKey::generate().encode()
    }

    /// Derives the per-operation key from text-encoded master key and salt.
    pub fn derive_key(&self, master_key: &str, salt: &str) -> CryptoResult<DerivedKey> {
        let master: MasterKey = master_key.parse().map_err(|e| match e {
            CryptoError::InvalidKeyLength { expected, actual } => CryptoError::KeyDerivation(
                format!("master key must be {expected} bytes, got {actual}"),
            ),
            other => other,
        })?;
        let salt = Salt::decode(salt)?;
        derive_key(&master, &salt, &self.params)
    }

    /// Seals `plaintext` under a key derived from `master` and a fresh salt.
    pub fn encrypt(&self, plaintext: &[u8], master: &MasterKey) -> CryptoResult<SealedBlob> {
        let salt = Salt::random();
        let key = derive_key(master, &salt, &self.params)?;
        let data = cipher::encrypt(&key, plaintext)?;
        Ok(SealedBlob::seal(&salt, &data))
    }

    /// Opens a blob produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, blob: &SealedBlob, master: &MasterKey) -> CryptoResult<Vec<u8>> {
        let (salt, data) = blob.open_parts()?;
        let key = derive_key(master, &salt, &self.params)?;
        cipher::decrypt(&key, &data)
    }

    pub fn encrypt_string(&self, plaintext: &str, master: &MasterKey) -> CryptoResult<SealedBlob> {
        self.encrypt(plaintext.as_bytes(), master)
    }

    /// Opens a blob and requires the plaintext to be UTF-8.
    pub fn decrypt_string(&self, blob: &SealedBlob, master: &MasterKey) -> CryptoResult<String> {
        let bytes = self.decrypt(blob, master)?;
        String::from_utf8(bytes)
            .map_err(|e| CryptoError::Encoding(format!("decrypted text is not UTF-8: {e}")))
    }
}

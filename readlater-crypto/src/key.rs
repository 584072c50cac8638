//! Key material: per-user master keys, salts, and Argon2id derivation.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of every symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of a derivation salt in bytes (128 bits).
pub const SALT_SIZE: usize = 16;

/// Long-lived per-user secret.
///
/// Owned by the account subsystem and handed in per call. It is never used
/// to encrypt directly; every encryption derives a fresh key from it.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    /// Generates a fresh random master key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Transport-safe text form (standard base64).
    pub fn encode(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl FromStr for MasterKey {
    type Err = CryptoError;

    /// Parses the base64 text form. Malformed input is a key derivation
    /// failure, since the key is unusable for deriving anything.
    fn from_str(encoded: &str) -> CryptoResult<Self> {
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyDerivation(format!("master key is not base64: {e}")))?;
        if decoded.len() != KEY_SIZE {
            let actual = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual,
            });
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// Random salt for one derivation. Stored in the clear next to its ciphertext.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parses a base64 salt. Anything malformed is a key derivation failure.
    pub fn decode(encoded: &str) -> CryptoResult<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyDerivation(format!("salt is not base64: {e}")))?;
        let bytes: [u8; SALT_SIZE] = decoded.as_slice().try_into().map_err(|_| {
            CryptoError::KeyDerivation(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                decoded.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Ephemeral key derived from a master key and salt. Never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Argon2id work factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes over memory.
    pub iterations: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Minimal parameters for tests. Not suitable for real data.
    pub fn for_testing() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn to_argon2(self) -> CryptoResult<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid argon2 params: {e}")))
    }

    /// Checks the parameters without running a derivation.
    pub fn validate(&self) -> CryptoResult<()> {
        self.to_argon2().map(|_| ())
    }
}

/// Derives a 256-bit key from `master` and `salt` with Argon2id.
///
/// Deterministic for a given (master, salt, params) triple.
pub fn derive_key(master: &MasterKey, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
    let mut out = [0u8; KEY_SIZE];
    argon
        .hash_password_into(master.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2 derive: {e}")))?;
    let key = DerivedKey::from_bytes(out);
    out.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_key_text_roundtrip() {
        let key = MasterKey::generate();
        let parsed: MasterKey = key.encode().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn master_key_rejects_garbage() {
        let err = "not base64!!".parse::<MasterKey>().unwrap_err();
        assert!(matches!(err, CryptoError::KeyDerivation(_)));

        let short = STANDARD.encode([1u8; 8]);
        let err = short.parse::<MasterKey>().unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength { expected: 32, actual: 8 }
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = MasterKey::from_bytes([7u8; KEY_SIZE]);
        assert_eq!(format!("{key:?}"), "MasterKey(<redacted>)");
    }

    #[test]
    fn same_inputs_same_key() {
        let params = KdfParams::for_testing();
        let master = MasterKey::generate();
        let salt = Salt::random();
        let a = derive_key(&master, &salt, &params).unwrap();
        let b = derive_key(&master, &salt, &params).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salt_different_key() {
        let params = KdfParams::for_testing();
        let master = MasterKey::generate();
        let a = derive_key(&master, &Salt::from_bytes([1u8; SALT_SIZE]), &params).unwrap();
        let b = derive_key(&master, &Salt::from_bytes([2u8; SALT_SIZE]), &params).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn salt_decode_checks_length() {
        let salt = Salt::random();
        assert_eq!(Salt::decode(&salt.encode()).unwrap(), salt);
        assert!(matches!(
            Salt::decode(&STANDARD.encode([0u8; 4])),
            Err(CryptoError::KeyDerivation(_))
        ));
    }

    #[test]
    fn zero_iterations_rejected() {
        let params = KdfParams {
            iterations: 0,
            ..KdfParams::for_testing()
        };
        assert!(matches!(params.validate(), Err(CryptoError::KeyDerivation(_))));
    }
}

//! Content store configuration.

use crate::error::{StorageError, StorageResult};
use readlater_crypto::KdfParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Configuration for the content store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory; user namespaces live under `<storage_root>/users/`.
    pub storage_root: PathBuf,

    /// Argon2id work factor for every field encryption.
    pub kdf: KdfParams,

    pub log: LogConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./data/storage"),
            kdf: KdfParams::default(),
            log: LogConfig::default(),
        }
    }
}

impl StoreConfig {
    /// A config rooted at `storage_root` with default everything else.
    pub fn at(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the process environment.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Unset or blank variables take
    /// defaults; values that are set but malformed are errors.
    pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_u32 = |key: &str, default: u32| -> StorageResult<u32> {
            match get(key) {
                Some(raw) => raw
                    .parse()
                    .map_err(|e| StorageError::Config(format!("{key}={raw:?}: {e}"))),
                None => Ok(default),
            }
        };

        let defaults = Self::default();
        let format = match get("LOG_FORMAT").as_deref() {
            None => defaults.log.format,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                _ => {
                    return Err(StorageError::Config(format!(
                        "LOG_FORMAT={raw:?}: expected \"json\" or \"text\""
                    )));
                }
            },
        };

        let config = Self {
            storage_root: get("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            kdf: KdfParams {
                memory_kib: get_u32("KDF_MEMORY_KIB", defaults.kdf.memory_kib)?,
                iterations: get_u32("KEY_DERIVATION_ITERATIONS", defaults.kdf.iterations)?,
                parallelism: get_u32("KDF_PARALLELISM", defaults.kdf.parallelism)?,
            },
            log: LogConfig {
                level: get("LOG_LEVEL").unwrap_or(defaults.log.level),
                format,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(StorageError::Config("storage root must not be empty".into()));
        }
        EnvFilter::try_new(&self.log.level)
            .map_err(|e| StorageError::Config(format!("LOG_LEVEL={:?}: {e}", self.log.level)))?;
        self.kdf
            .validate()
            .map_err(|e| StorageError::Config(e.to_string()))
    }
}

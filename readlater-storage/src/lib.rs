//! Content storage layer for ReadLater.
//!
//! Persists captured article content per user as JSON records on the local
//! filesystem, optionally sealing the text fields with the user's master key.
//!
//! # Architecture
//!
//! - One namespace directory per user, created on first write
//! - One `<article_id>.json` record per article, replaced atomically on save
//! - `content` and `summary` are sealed through `readlater_crypto` when a key
//!   is supplied; the `is_encrypted` flag says which form is on disk
//! - Listing and stats read the directory directly; there is no index
//!
//! Key rotation is available as [`ContentStore::rekey`].

mod config;
mod content_store;
mod error;
mod namespace;
mod record;
pub mod telemetry;

pub use config::{LogConfig, LogFormat, StoreConfig};
pub use content_store::{
    ContentStore, RecordIter, RecordLocation, RekeyReport, StorageStats, UserRecords,
};
pub use error::{StorageError, StorageResult};
pub use namespace::{RECORD_SUFFIX, validate_id};
pub use record::ContentRecord;

//! Per-user article content store with optional field encryption.
//!
//! Records are JSON files, one per article, in a per-user namespace. When
//! a master key is supplied on save, `content` and a non-empty `summary`
//! are sealed through the [`FieldEncryptor`] and the record is flagged
//! `is_encrypted`. Everything else stays plaintext so listings and stats
//! work without a key.
//!
//! There is no cache or index: the filesystem is the only source of truth.
//! Writers to the same article race with last-write-wins semantics; each
//! write is an atomic rename, so readers never see a torn record.

use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::namespace::{Namespace, RecordFiles};
use crate::record::ContentRecord;
use chrono::Utc;
use readlater_crypto::{EncryptionEngine, FieldEncryptor, MasterKey};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a record was written. Opaque to callers beyond display and path access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLocation(PathBuf);

impl RecordLocation {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Aggregate usage for one user's namespace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub total_records: u64,
    /// Sum of raw serialized record sizes.
    pub total_bytes: u64,
    pub encrypted_records: u64,
}

/// Outcome of [`ContentStore::rekey`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RekeyReport {
    /// Encrypted records now sealed under the new key.
    pub reencrypted: u64,
    /// Records that already opened under the new key (an earlier run got to them).
    pub already_rotated: u64,
    /// Plaintext records left untouched.
    pub plaintext: u64,
}

/// File-backed content store.
#[derive(Clone)]
pub struct ContentStore {
    root: PathBuf,
    encryptor: Arc<dyn FieldEncryptor>,
}

impl ContentStore {
    /// Creates a store rooted at `root` using `encryptor` for sealed fields.
    pub fn new(root: impl Into<PathBuf>, encryptor: Arc<dyn FieldEncryptor>) -> Self {
        Self {
            root: root.into(),
            encryptor,
        }
    }

    /// Builds the store and its encryption engine from configuration.
    pub fn from_config(config: &StoreConfig) -> StorageResult<Self> {
        config.validate()?;
        let engine = EncryptionEngine::new(config.kdf)?;
        Ok(Self::new(config.storage_root.clone(), Arc::new(engine)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace(&self, user_id: &str) -> StorageResult<Namespace> {
        Namespace::new(&self.root, user_id)
    }

    /// Stores `record` for (user, article), replacing any previous record.
    ///
    /// With a key, `content` and a non-empty `summary` are sealed and the
    /// record is flagged encrypted; without one they are written as given.
    /// `id`, `user_id` and `updated_at` are stamped here. `created_at` is
    /// carried over from the record being replaced, if there is one.
    pub fn save(
        &self,
        user_id: &str,
        article_id: &str,
        mut record: ContentRecord,
        key: Option<&MasterKey>,
    ) -> StorageResult<RecordLocation> {
        let ns = self.namespace(user_id)?;
        let path = ns.record_path(article_id)?;

        if record.is_encrypted {
            return Err(StorageError::InvalidRecord(
                "record is already sealed; decrypt it before saving".into(),
            ));
        }

        record.id = article_id.to_string();
        record.user_id = user_id.to_string();
        record.updated_at = Utc::now();
        if let Some(previous) = self.load_existing(&ns, &path) {
            record.created_at = previous.created_at;
        }

        if let Some(key) = key {
            self.seal_fields(&mut record, key)?;
        }

        ns.ensure()?;
        write_record(&ns, &path, &record)?;

        info!(
            user_id,
            article_id,
            path = %path.display(),
            encrypted = record.is_encrypted,
            "content saved"
        );
        Ok(RecordLocation(path))
    }

    /// Returns the record exactly as stored, sealed fields included.
    pub fn get(&self, user_id: &str, article_id: &str) -> StorageResult<ContentRecord> {
        let ns = self.namespace(user_id)?;
        let path = ns.record_path(article_id)?;

        let bytes = ns.read(&path)?.ok_or_else(|| StorageError::NotFound {
            user_id: user_id.to_string(),
            article_id: article_id.to_string(),
        })?;
        let record = serde_json::from_slice(&bytes)?;

        debug!(user_id, article_id, path = %path.display(), "content retrieved");
        Ok(record)
    }

    /// Returns the record with sealed fields opened under `key`.
    ///
    /// Plaintext records come back unchanged. A wrong key surfaces as
    /// `StorageError::Crypto(CryptoError::Authentication)`.
    pub fn get_decrypted(
        &self,
        user_id: &str,
        article_id: &str,
        key: &MasterKey,
    ) -> StorageResult<ContentRecord> {
        let record = self.get(user_id, article_id)?;
        self.decrypt_record(record, key)
    }

    /// Opens the sealed fields of a record obtained from `get` or `list`.
    pub fn decrypt_record(
        &self,
        mut record: ContentRecord,
        key: &MasterKey,
    ) -> StorageResult<ContentRecord> {
        if !record.is_encrypted {
            return Ok(record);
        }
        record.content = self.encryptor.open_text(&record.content, key)?;
        if record.has_summary() {
            record.summary = self.encryptor.open_text(&record.summary, key)?;
        }
        record.is_encrypted = false;
        Ok(record)
    }

    /// Removes the record. A second delete of the same article is `NotFound`.
    pub fn delete(&self, user_id: &str, article_id: &str) -> StorageResult<()> {
        let ns = self.namespace(user_id)?;
        let path = ns.record_path(article_id)?;

        if !ns.remove(&path)? {
            return Err(StorageError::NotFound {
                user_id: user_id.to_string(),
                article_id: article_id.to_string(),
            });
        }

        info!(user_id, article_id, path = %path.display(), "content deleted");
        Ok(())
    }

    pub fn exists(&self, user_id: &str, article_id: &str) -> StorageResult<bool> {
        let path = self.namespace(user_id)?.record_path(article_id)?;
        Ok(path.is_file())
    }

    /// Lists every record in the user's namespace.
    ///
    /// The returned handle reads lazily and can be iterated more than once;
    /// each pass re-reads the directory. Unparsable records are skipped
    /// with a warning. A user with no namespace has no records, but a
    /// namespace that exists and cannot be read is an error.
    pub fn list(&self, user_id: &str) -> StorageResult<UserRecords> {
        let namespace = self.namespace(user_id)?;
        namespace.record_files()?;
        Ok(UserRecords { namespace })
    }

    /// Counts records, their raw size, and how many are encrypted.
    pub fn stats(&self, user_id: &str) -> StorageResult<StorageStats> {
        let ns = self.namespace(user_id)?;
        let mut stats = StorageStats::default();

        for path in ns.record_files()? {
            let path = path.map_err(|e| StorageError::io(ns.dir(), e))?;
            let bytes = match ns.read(&path) {
                Ok(Some(bytes)) => bytes,
                // Deleted between listing and reading.
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable record in stats");
                    continue;
                }
            };

            stats.total_records += 1;
            stats.total_bytes += bytes.len() as u64;
            match serde_json::from_slice::<ContentRecord>(&bytes) {
                Ok(record) if record.is_encrypted => stats.encrypted_records += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unparsable record counted without encryption flag");
                }
            }
        }

        Ok(stats)
    }

    /// Re-seals every encrypted record of a user from `old_key` to `new_key`.
    ///
    /// Every encrypted record is opened before anything is written, so a
    /// record that opens under neither key fails the call with the
    /// namespace untouched. Records that already open under `new_key` are
    /// counted as rotated and left alone, which makes a run interrupted
    /// during the write phase safe to repeat with the same keys.
    /// Timestamps are not touched; the content itself did not change.
    pub fn rekey(
        &self,
        user_id: &str,
        old_key: &MasterKey,
        new_key: &MasterKey,
    ) -> StorageResult<RekeyReport> {
        let ns = self.namespace(user_id)?;
        let mut report = RekeyReport::default();

        // Open everything first: rotating renames files inside the directory
        // being read, and a bad record must not leave a half-rotated namespace.
        let mut pending: Vec<(PathBuf, ContentRecord)> = Vec::new();
        for path in ns.record_files()? {
            let path = path.map_err(|e| StorageError::io(ns.dir(), e))?;
            let Some(record) = load_record_file(&ns, &path) else {
                continue;
            };
            if !record.is_encrypted {
                report.plaintext += 1;
                continue;
            }
            match self.decrypt_record(record.clone(), old_key) {
                Ok(opened) => pending.push((path, opened)),
                Err(e) if e.is_authentication() => {
                    self.decrypt_record(record, new_key).map_err(|_| e)?;
                    report.already_rotated += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for (path, mut record) in pending {
            self.seal_fields(&mut record, new_key)?;
            write_record(&ns, &path, &record)?;
            report.reencrypted += 1;
        }

        info!(
            user_id,
            reencrypted = report.reencrypted,
            already_rotated = report.already_rotated,
            plaintext = report.plaintext,
            "namespace rekeyed"
        );
        Ok(report)
    }

    fn seal_fields(&self, record: &mut ContentRecord, key: &MasterKey) -> StorageResult<()> {
        record.content = self.encryptor.seal_text(&record.content, key)?;
        if record.has_summary() {
            record.summary = self.encryptor.seal_text(&record.summary, key)?;
        }
        record.is_encrypted = true;
        Ok(())
    }

    /// The record currently stored at `path`, if it exists and parses.
    fn load_existing(&self, ns: &Namespace, path: &Path) -> Option<ContentRecord> {
        let bytes = ns.read(path).ok()??;
        serde_json::from_slice(&bytes).ok()
    }
}

fn write_record(ns: &Namespace, path: &Path, record: &ContentRecord) -> StorageResult<()> {
    let bytes = serde_json::to_vec(record)?;
    ns.write_atomic(path, &bytes)
}

/// Loads one record file, logging and dropping anything unreadable.
fn load_record_file(ns: &Namespace, path: &Path) -> Option<ContentRecord> {
    let bytes = match ns.read(path) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read article file");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse article file");
            None
        }
    }
}

/// Restartable listing of one user's records. See [`ContentStore::list`].
#[derive(Clone, Debug)]
pub struct UserRecords {
    namespace: Namespace,
}

impl UserRecords {
    /// Starts a fresh pass over the namespace.
    ///
    /// Directory-level failures are yielded as errors; individual records
    /// that cannot be read or parsed are skipped.
    pub fn iter(&self) -> RecordIter<'_> {
        let (files, failed) = match self.namespace.record_files() {
            Ok(files) => (Some(files), None),
            Err(e) => (None, Some(e)),
        };
        RecordIter {
            namespace: &self.namespace,
            files,
            failed,
        }
    }
}

impl<'a> IntoIterator for &'a UserRecords {
    type Item = StorageResult<ContentRecord>;
    type IntoIter = RecordIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One lazy pass over a namespace.
pub struct RecordIter<'a> {
    namespace: &'a Namespace,
    files: Option<RecordFiles>,
    failed: Option<StorageError>,
}

impl Iterator for RecordIter<'_> {
    type Item = StorageResult<ContentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.failed.take() {
            return Some(Err(e));
        }
        let files = self.files.as_mut()?;
        loop {
            let path = match files.next()? {
                Ok(path) => path,
                Err(e) => return Some(Err(StorageError::io(self.namespace.dir(), e))),
            };
            if let Some(record) = load_record_file(self.namespace, &path) {
                return Some(Ok(record));
            }
        }
    }
}

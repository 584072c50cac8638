//! Per-user directories on the local filesystem.
//!
//! Layout: `<root>/users/<user_id>/<article_id>.json`. A namespace directory
//! is created lazily by the first write and never ahead of time.

use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Suffix of every record file.
pub const RECORD_SUFFIX: &str = "json";

const STAGING_SUFFIX: &str = "staging";
const MAX_ID_LEN: usize = 128;

/// Rejects ids that are empty, too long, or could escape the namespace.
pub fn validate_id(id: &str) -> StorageResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id != "."
        && id != ".."
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// One user's record directory.
#[derive(Clone, Debug)]
pub struct Namespace {
    dir: PathBuf,
}

impl Namespace {
    pub fn new(root: &Path, user_id: &str) -> StorageResult<Self> {
        validate_id(user_id)?;
        Ok(Self {
            dir: root.join("users").join(user_id),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the directory if needed. Safe to call repeatedly.
    pub fn ensure(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))
    }

    pub fn record_path(&self, article_id: &str) -> StorageResult<PathBuf> {
        validate_id(article_id)?;
        Ok(self.dir.join(format!("{article_id}.{RECORD_SUFFIX}")))
    }

    /// Reads a record file. `Ok(None)` when it does not exist.
    pub fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Writes `bytes` to `dest` through a staging file and a rename, so a
    /// concurrent reader sees either the old record or the new one.
    pub fn write_atomic(&self, dest: &Path, bytes: &[u8]) -> StorageResult<()> {
        let staging = self
            .dir
            .join(format!("{}.{STAGING_SUFFIX}", Uuid::new_v4()));

        let written = File::create(&staging).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(StorageError::io(&staging, e));
        }

        if let Err(e) = fs::rename(&staging, dest) {
            let _ = fs::remove_file(&staging);
            return Err(StorageError::io(dest, e));
        }
        Ok(())
    }

    /// Removes a record file. `Ok(false)` when there was nothing to remove.
    pub fn remove(&self, path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Lazily lists record files. Staging files and anything without the
    /// record suffix are skipped. A missing namespace yields nothing.
    pub fn record_files(&self) -> StorageResult<RecordFiles> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => Some(entries),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        };
        Ok(RecordFiles { entries })
    }
}

/// Iterator over the record files in one namespace.
pub struct RecordFiles {
    entries: Option<fs::ReadDir>,
}

impl Iterator for RecordFiles {
    type Item = io::Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries.as_mut()?;
        loop {
            let entry = match entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == RECORD_SUFFIX);
            if is_record && path.is_file() {
                return Some(Ok(path));
            }
        }
    }
}

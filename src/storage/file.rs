//! File storage backend.
//!
//! Stores every entry in a single JSON object at `<data-dir>/store.json`,
//! the native stand-in for the browser's `localStorage`.
//!
//! ## How It Works
//!
//! 1. The file is read once when the backend is opened
//! 2. Every mutation rewrites the whole file through a temp file + rename
//! 3. The data directory is created lazily on first write

use super::backend::{BackendType, KvBackend};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the JSON map inside the data directory.
pub const STORE_FILE: &str = "store.json";

/// Storage backend persisted to a JSON file.
#[derive(Debug)]
pub struct FileBackend {
    /// Directory holding the store file.
    dir: PathBuf,
    /// Cached contents of the store file.
    entries: BTreeMap<String, String>,
}

impl FileBackend {
    /// Open the store in `dir`, loading existing entries if present.
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(STORE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Store file is not a JSON object, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn flush(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::StorageUnavailable(format!("{}: {}", self.dir.display(), e))
        })?;

        let json = serde_json::to_string(&self.entries)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(self.path())
            .map_err(|e| Error::StorageWriteFailure(e.to_string()))?;
        Ok(())
    }
}

impl KvBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, raw: &str) -> Result<()> {
        let previous = self.entries.insert(key.to_string(), raw.to_string());
        if let Err(e) = self.flush() {
            // Keep the cache in step with what is on disk
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let Some(old) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.entries.insert(key.to_string(), old);
            return Err(e);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let previous = std::mem::take(&mut self.entries);
        if let Err(e) = self.flush() {
            self.entries = previous;
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn location(&self) -> String {
        self.path().display().to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::File
    }
}

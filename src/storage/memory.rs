//! In-process storage backend.
//!
//! Used directly in tests and as the fallback medium when the durable
//! backend fails its probe.

use super::backend::{BackendType, KvBackend};
use crate::{Error, Result};
use std::collections::HashMap;

/// Storage backend that keeps entries in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
    /// Maximum total bytes (keys + values), if limited.
    quota: Option<usize>,
}

impl MemoryBackend {
    /// Create an unlimited in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects writes once `bytes` would be exceeded,
    /// the way a browser rejects writes past its storage quota.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KvBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, raw: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + raw.len();
            if needed > quota {
                return Err(Error::StorageWriteFailure(format!(
                    "quota exceeded: {} of {} bytes",
                    needed, quota
                )));
            }
        }
        self.entries.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn location(&self) -> String {
        "in-memory".to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}

//! Storage backend trait and implementations.
//!
//! This module provides the raw key-value media the adapter can sit on:
//! - `MemoryBackend` - In-process map (fallback, tests)
//! - `FileBackend` - JSON map file in the data directory (native default)
//! - `LocalStorageBackend` - Browser `localStorage` (wasm)

use crate::Result;

/// Trait for raw key-value media that hold serialized strings.
///
/// Backends only move strings around; enveloping, legacy coercion and
/// failure swallowing live in [`super::KvStore`].
pub trait KvBackend: Send {
    /// Read the raw string stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Store `raw` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, raw: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Delete every key.
    fn clear(&mut self) -> Result<()>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;
}

/// Available storage backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// In-process map, lost when the process exits
    Memory,
    /// JSON map file - <data-dir>/store.json
    File,
    /// Browser localStorage
    LocalStorage,
}

impl BackendType {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::LocalStorage => "local-storage",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_display() {
        assert_eq!(BackendType::LocalStorage.to_string(), "local-storage");
    }
}

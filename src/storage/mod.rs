//! Storage layer for Taskgate data.
//!
//! This module handles persistence of the session record, the session token
//! and the per-owner task lists.
//!
//! ## Storage Backends
//!
//! - **File backend** (native default): `<data-dir>/store.json`
//! - **Local storage backend** (browser): `window.localStorage`
//! - **Memory backend**: fallback when the durable medium is unavailable
//!
//! All values pass through [`KvStore`], which wraps them in an
//! [`Envelope`] and never lets a backend failure escape: failures are logged
//! and reported as `false` / the caller's default.

pub mod backend;
pub mod envelope;
#[cfg(not(target_arch = "wasm32"))]
pub mod file;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod local;
pub mod memory;

pub use backend::{BackendType, KvBackend};
pub use envelope::{Envelope, Stored, TypeTag};
#[cfg(not(target_arch = "wasm32"))]
pub use file::FileBackend;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use local::LocalStorageBackend;
pub use memory::MemoryBackend;

use crate::clock::{Clock, SystemClock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Key written and deleted by [`KvStore::probe`].
const PROBE_KEY: &str = "__taskgate_probe__";

/// Persisted key for the session token.
pub const TOKEN_KEY: &str = "auth_token";
/// Persisted key for the session record.
pub const SESSION_KEY: &str = "current_user";
/// Persisted key for the login timestamp.
pub const LOGIN_TIME_KEY: &str = "login_time";
/// Legacy key holding the unscoped task list.
pub const LEGACY_TASKS_KEY: &str = "tasks";

/// Persisted key for an owner's task list.
pub fn tasks_key(owner_id: &str) -> String {
    format!("tasks_{}", owner_id)
}

struct Inner {
    backend: Box<dyn KvBackend>,
    /// Whether `backend` is the durable medium (false once on the fallback).
    available: bool,
}

/// Key-value store adapter shared by the session manager and the task store.
pub struct KvStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("KvStore")
            .field("backend", &inner.backend.backend_type())
            .field("location", &inner.backend.location())
            .field("available", &inner.available)
            .finish()
    }
}

impl KvStore {
    /// Build an adapter on `backend`, falling back to memory if it fails its probe.
    pub fn new(backend: Box<dyn KvBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// Like [`KvStore::new`], stamping envelopes with `clock`.
    pub fn with_clock(backend: Box<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        let store = Self {
            inner: Mutex::new(Inner {
                backend,
                available: true,
            }),
            clock,
        };

        if !store.probe() {
            let mut inner = store.lock();
            tracing::warn!(
                backend = %inner.backend.backend_type(),
                location = %inner.backend.location(),
                "Storage unavailable, using in-memory fallback"
            );
            inner.backend = Box::new(MemoryBackend::new());
            inner.available = false;
        }

        store
    }

    /// Open the file store in `data_dir`, or an in-memory store if that fails.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open(data_dir: &Path) -> Self {
        match FileBackend::open(data_dir) {
            Ok(backend) => Self::new(Box::new(backend)),
            Err(e) => {
                tracing::warn!(
                    path = %data_dir.display(),
                    error = %e,
                    "Could not open store file, using in-memory fallback"
                );
                let store = Self::new(Box::new(MemoryBackend::new()));
                store.lock().available = false;
                store
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic mid-write cannot leave the map half-updated; keep going
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Try a write/delete cycle on the current backing.
    pub fn probe(&self) -> bool {
        let mut inner = self.lock();
        let backend = &mut inner.backend;
        let result = match backend.write(PROBE_KEY, PROBE_KEY) {
            Ok(()) => backend.delete(PROBE_KEY),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Storage probe failed");
                false
            }
        }
    }

    /// Whether values are going to the durable medium rather than the fallback.
    pub fn is_available(&self) -> bool {
        self.lock().available
    }

    /// Type of the backend currently in use.
    pub fn backend_type(&self) -> BackendType {
        self.lock().backend.backend_type()
    }

    /// Description of where values are going.
    pub fn location(&self) -> String {
        self.lock().backend.location()
    }

    /// Wrap `value` in an envelope and store it under `key`.
    ///
    /// Returns false (and logs) if serialization or the write fails.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "Could not serialize value");
                return false;
            }
        };
        let envelope = Envelope::wrap(value, self.clock.now());
        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Could not serialize envelope");
                return false;
            }
        };

        match self.lock().backend.write(key, &raw) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage write failed");
                false
            }
        }
    }

    /// Read the stored entry under `key` as found on the medium.
    pub fn get_stored(&self, key: &str) -> Stored {
        match self.lock().backend.read(key) {
            Ok(Some(raw)) => envelope::unwrap_raw(&raw),
            Ok(None) => Stored::Absent,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage read failed");
                Stored::Absent
            }
        }
    }

    /// Read and decode the value under `key`.
    ///
    /// Missing, `undefined` and undecodable entries all come back as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.get_stored(key) {
            Stored::Enveloped(envelope) => envelope.value,
            Stored::Legacy(value) => {
                tracing::debug!(key, "Read legacy value without envelope");
                value
            }
            Stored::Absent => return None,
        };

        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored value has unexpected shape");
                None
            }
        }
    }

    /// Read the value under `key`, or `default` when there is none usable.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Delete `key`. Returns false (and logs) on failure.
    pub fn remove(&self, key: &str) -> bool {
        match self.lock().backend.delete(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage delete failed");
                false
            }
        }
    }

    /// Delete every key. Returns false (and logs) on failure.
    pub fn clear(&self) -> bool {
        match self.lock().backend.clear() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Storage clear failed");
                false
            }
        }
    }

    /// Sorted keys, optionally restricted to those starting with `prefix`.
    pub fn list_keys(&self, prefix: Option<&str>) -> Vec<String> {
        let mut keys = match self.lock().backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Storage key listing failed");
                return Vec::new();
            }
        };
        if let Some(prefix) = prefix {
            keys.retain(|k| k.starts_with(prefix));
        }
        keys.sort();
        keys
    }
}

/// Get the default data directory.
///
/// Returns `~/.local/share/taskgate` on Linux (platform equivalent
/// elsewhere), or `./.taskgate` when no data directory is known.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("taskgate"))
        .unwrap_or_else(|| PathBuf::from(".taskgate"))
}

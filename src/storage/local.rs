//! Browser `localStorage` backend.
//!
//! The `Storage` handle is looked up from `window` on every call instead of
//! being held, so the backend carries no JS objects.

use super::backend::{BackendType, KvBackend};
use crate::{Error, Result};
use wasm_bindgen::JsValue;

/// Storage backend on top of `window.localStorage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageBackend;

impl LocalStorageBackend {
    /// Create a backend for the current window.
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| Error::StorageUnavailable("no window".to_string()))?
            .local_storage()
            .map_err(|e| Error::StorageUnavailable(js_error(&e)))?
            .ok_or_else(|| Error::StorageUnavailable("localStorage disabled".to_string()))
    }
}

fn js_error(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

impl KvBackend for LocalStorageBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| Error::StorageUnavailable(js_error(&e)))
    }

    fn write(&mut self, key: &str, raw: &str) -> Result<()> {
        // QuotaExceededError surfaces here
        Self::storage()?
            .set_item(key, raw)
            .map_err(|e| Error::StorageWriteFailure(js_error(&e)))
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| Error::StorageWriteFailure(js_error(&e)))
    }

    fn clear(&mut self) -> Result<()> {
        Self::storage()?
            .clear()
            .map_err(|e| Error::StorageWriteFailure(js_error(&e)))
    }

    fn keys(&self) -> Result<Vec<String>> {
        let storage = Self::storage()?;
        let len = storage
            .length()
            .map_err(|e| Error::StorageUnavailable(js_error(&e)))?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Ok(Some(key)) = storage.key(i) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn location(&self) -> String {
        "window.localStorage".to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::LocalStorage
    }
}

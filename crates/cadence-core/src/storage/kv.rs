//! Key-value persistence contract.
//!
//! Every persisted entity lives under its own key as a JSON document. Stores
//! are single-writer: one process, no transactions, no locking.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;

pub const DURATIONS_KEY: &str = "cadence.durations";
pub const TASKS_KEY: &str = "cadence.tasks";
pub const ACTIVE_TASK_KEY: &str = "cadence.active_task";
pub const SESSIONS_KEY: &str = "cadence.sessions";

/// Durable string-to-string storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Decode the JSON value under `key`. A missing key is `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PersistenceError> {
    match kv.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PersistenceError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and write it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    kv: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string(value).map_err(|source| PersistenceError::Encode {
        key: key.to_string(),
        source,
    })?;
    kv.set(key, &raw)
}

/// Load `key`, falling back to `T::default()` when it is missing or unreadable.
///
/// The error is returned alongside the fallback so the caller can surface it.
pub fn load_or_default<T: DeserializeOwned + Default>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> (T, Option<PersistenceError>) {
    match load_json(kv, key) {
        Ok(Some(value)) => (value, None),
        Ok(None) => (T::default(), None),
        Err(e) => {
            tracing::warn!(key, error = %e, "falling back to defaults");
            (T::default(), Some(e))
        }
    }
}

/// In-process store, used by tests and as a scratch backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
    reject_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail, as a full disk would.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    /// Write a raw value, bypassing the write switch.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    fn check_writable(&self, key: &str) -> Result<(), PersistenceError> {
        if self.reject_writes.get() {
            return Err(PersistenceError::WriteFailed {
                key: key.to_string(),
                message: "storage quota exceeded".into(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.check_writable(key)?;
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.check_writable(key)?;
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

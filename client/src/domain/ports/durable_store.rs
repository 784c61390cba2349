//! Driven port for the device's string-keyed persistent storage.
//!
//! The session keeps four independent keys here. Each key is read on its own
//! by different guards, so adapters must never couple them: a missing key is
//! simply `Ok(None)`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::define_port_error;

/// Keys the session writes to durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Serialised identity record.
    Identity,
    /// Bare session token.
    Token,
    /// Locally generated device identifier.
    DeviceId,
    /// Role tag chosen by the user.
    SelectedRole,
}

impl StorageKey {
    /// Every key, in a stable order.
    pub const ALL: [Self; 4] = [
        Self::Identity,
        Self::Token,
        Self::DeviceId,
        Self::SelectedRole,
    ];

    /// Storage key string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "user",
            Self::Token => "token",
            Self::DeviceId => "deviceId",
            Self::SelectedRole => "selectedRole",
        }
    }
}

define_port_error! {
    /// Errors raised by durable storage adapters.
    pub enum DurableStoreError {
        /// Reading a key failed.
        Read { key: String, message: String } =>
            "durable store read of '{key}' failed: {message}",
        /// Writing or removing a key failed.
        Write { key: String, message: String } =>
            "durable store write of '{key}' failed: {message}",
    }
}

/// Port for string-keyed persistent storage.
///
/// Implementations are synchronous: guards read storage during every
/// navigation and must not suspend.
#[cfg_attr(test, mockall::automock)]
pub trait DurableStore: Send + Sync {
    /// Fetch a value; `Ok(None)` when the key has never been written.
    fn get(&self, key: StorageKey) -> Result<Option<String>, DurableStoreError>;

    /// Store a value, replacing any previous one.
    fn set(&self, key: StorageKey, value: &str) -> Result<(), DurableStoreError>;

    /// Delete a key. Removing a missing key succeeds.
    fn remove(&self, key: StorageKey) -> Result<(), DurableStoreError>;
}

/// In-process store used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    entries: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryDurableStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (StorageKey, &'a str)>) -> Self {
        let store = Self::new();
        store.lock().extend(
            entries
                .into_iter()
                .map(|(key, value)| (key, value.to_owned())),
        );
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<StorageKey, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for MemoryDurableStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, DurableStoreError> {
        Ok(self.lock().get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), DurableStoreError> {
        self.lock().insert(key, value.to_owned());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), DurableStoreError> {
        self.lock().remove(&key);
        Ok(())
    }
}

//! Typed view over the durable session keys.
//!
//! Reads never fail: a storage error, a blank value or a malformed blob all
//! count as "absent" so a damaged cache degrades to a logged-out session
//! instead of wedging navigation.

use std::sync::Arc;

use tracing::{debug, warn};

use super::ports::{DurableStore, DurableStoreError, StorageKey};
use super::{DeviceId, Identity, Role, SessionToken};

/// Durable session cache backed by a [`DurableStore`].
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn DurableStore>,
}

impl SessionCache {
    /// Wrap a storage adapter.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    fn read(&self, key: StorageKey) -> Option<String> {
        match self.store.get(key) {
            Ok(Some(value)) if !value.trim().is_empty() => Some(value),
            Ok(_) => None,
            Err(error) => {
                warn!(key = key.as_str(), %error, "durable read failed; treating key as absent");
                None
            }
        }
    }

    /// Whether the identity key holds anything at all.
    pub fn has_identity_blob(&self) -> bool {
        self.read(StorageKey::Identity).is_some()
    }

    /// Decode the identity blob.
    pub fn identity(&self) -> Option<Identity> {
        let blob = self.read(StorageKey::Identity)?;
        match serde_json::from_str(&blob) {
            Ok(identity) => Some(identity),
            Err(error) => {
                warn!(%error, "stored identity is malformed; ignoring it");
                None
            }
        }
    }

    /// Bare session token.
    pub fn token(&self) -> Option<SessionToken> {
        self.read(StorageKey::Token).and_then(SessionToken::new)
    }

    /// Raw selected-role string, trimmed.
    pub fn selected_role_tag(&self) -> Option<String> {
        self.read(StorageKey::SelectedRole)
            .map(|tag| tag.trim().to_owned())
    }

    /// Selected role, when it names a known role.
    pub fn selected_role(&self) -> Option<Role> {
        let tag = self.selected_role_tag()?;
        match Role::parse_tag(&tag) {
            Ok(role) => Some(role),
            Err(error) => {
                warn!(%error, "stored role is not recognised; ignoring it");
                None
            }
        }
    }

    /// Return the device id, creating and persisting one on first use.
    ///
    /// A failed write still yields a usable id; the next call will try to
    /// persist a new one.
    pub fn device_id(&self) -> DeviceId {
        if let Some(existing) = self
            .read(StorageKey::DeviceId)
            .as_deref()
            .and_then(DeviceId::from_stored)
        {
            return existing;
        }
        let generated = DeviceId::generate();
        match self.store.set(StorageKey::DeviceId, generated.as_str()) {
            Ok(()) => debug!(device_id = %generated, "created device id"),
            Err(error) => warn!(%error, "failed to persist device id"),
        }
        generated
    }

    /// Mirror `identity` into the blob and, when present, the bare token.
    pub fn store_identity(&self, identity: &Identity) -> Result<(), DurableStoreError> {
        let blob = serde_json::to_string(identity).map_err(|error| {
            DurableStoreError::write(StorageKey::Identity.as_str(), error.to_string())
        })?;
        self.store.set(StorageKey::Identity, &blob)?;
        if let Some(token) = identity.token() {
            self.store.set(StorageKey::Token, token.expose())?;
        }
        Ok(())
    }

    /// Persist the selected role tag.
    pub fn store_role(&self, role: Role) -> Result<(), DurableStoreError> {
        self.store.set(StorageKey::SelectedRole, role.as_str())
    }

    /// Remove identity, token and role. The device id survives.
    ///
    /// Every key is attempted; the first failure is returned.
    pub fn clear_session(&self) -> Result<(), DurableStoreError> {
        [StorageKey::Identity, StorageKey::Token, StorageKey::SelectedRole]
            .into_iter()
            .map(|key| self.store.remove(key))
            .fold(Ok(()), |first, result| first.and(result))
    }
}

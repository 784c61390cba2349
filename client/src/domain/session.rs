//! Authoritative session facade.
//!
//! [`Session`] pairs the in-memory [`SessionStore`] with the durable
//! [`SessionCache`]. Guards read a [`SessionSnapshot`] derived from both, and
//! stages write through the facade so the two never drift apart silently.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ports::{AuthApi, DurableStore};
use super::{
    AppRoute, Identity, Operation, Role, SessionCache, SessionStore, StageError, StageTransition,
};

/// How the session sources combine into "authorised".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationPolicy {
    /// An identity record, in memory or as the durable blob, authorises.
    /// A bare token alone does not.
    #[default]
    Reconciled,
    /// Any one of identity, bare token or identity blob authorises.
    AnySource,
}

impl AuthorizationPolicy {
    /// Configuration tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reconciled => "reconciled",
            Self::AnySource => "any-source",
        }
    }
}

impl fmt::Display for AuthorizationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognised policy tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicyError(pub String);

impl fmt::Display for UnknownPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown authorization policy '{}'; expected 'reconciled' or 'any-source'",
            self.0
        )
    }
}

impl std::error::Error for UnknownPolicyError {}

impl FromStr for AuthorizationPolicy {
    type Err = UnknownPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reconciled" => Ok(Self::Reconciled),
            "any-source" | "any_source" => Ok(Self::AnySource),
            _ => Err(UnknownPolicyError(s.to_owned())),
        }
    }
}

/// Raw inputs to a guard decision, read fresh on every navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSources {
    /// In-memory identity.
    pub identity: Option<Identity>,
    /// Whether the durable bare token is set.
    pub has_token: bool,
    /// Whether the durable identity blob is set.
    pub has_identity_blob: bool,
    /// Durable selected-role string, trimmed.
    pub stored_role: Option<String>,
}

impl SessionSources {
    /// Derive the guard view under `policy`.
    pub fn snapshot(&self, policy: AuthorizationPolicy) -> SessionSnapshot {
        let identity_role = self.identity.as_ref().and_then(Identity::role);
        match policy {
            AuthorizationPolicy::Reconciled => {
                let stored_role = self
                    .stored_role
                    .as_deref()
                    .and_then(|tag| Role::parse_tag(tag).ok());
                SessionSnapshot {
                    authorized: self.identity.is_some() || self.has_identity_blob,
                    role_tag: stored_role
                        .or(identity_role)
                        .map(|role| role.as_str().to_owned()),
                }
            }
            AuthorizationPolicy::AnySource => SessionSnapshot {
                authorized: self.identity.is_some() || self.has_token || self.has_identity_blob,
                role_tag: self
                    .stored_role
                    .as_deref()
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_ascii_uppercase)
                    .or_else(|| identity_role.map(|role| role.as_str().to_owned())),
            },
        }
    }
}

/// Guard view of the session. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Whether the session counts as signed in.
    pub authorized: bool,
    /// Effective role tag, upper-cased; the durable role wins over the
    /// identity's.
    pub role_tag: Option<String>,
}

impl SessionSnapshot {
    /// Whether any role is present.
    pub fn has_role(&self) -> bool {
        self.role_tag.is_some()
    }

    /// Whether the effective role is one of `allowed`.
    pub fn role_in(&self, allowed: &[Role]) -> bool {
        self.role_tag
            .as_deref()
            .is_some_and(|tag| allowed.iter().any(|role| role.as_str() == tag))
    }
}

/// Shared handle over the in-memory record and the durable cache.
#[derive(Clone)]
pub struct Session {
    store: SessionStore,
    cache: SessionCache,
    policy: AuthorizationPolicy,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Fresh session over `durable` with an empty in-memory record.
    pub fn new(durable: Arc<dyn DurableStore>, policy: AuthorizationPolicy) -> Self {
        Self {
            store: SessionStore::new(),
            cache: SessionCache::new(durable),
            policy,
        }
    }

    /// Session whose in-memory identity is restored from the durable blob.
    pub fn hydrate(durable: Arc<dyn DurableStore>, policy: AuthorizationPolicy) -> Self {
        let session = Self::new(durable, policy);
        if let Some(identity) = session.cache.identity() {
            debug!(user_id = %identity.id(), "restored identity from durable cache");
            session.store.replace_identity(Some(identity));
        }
        session
    }

    /// In-memory record.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Durable cache.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Active authorisation policy.
    pub fn policy(&self) -> AuthorizationPolicy {
        self.policy
    }

    /// Current in-memory identity.
    pub fn identity(&self) -> Option<Identity> {
        self.store.identity()
    }

    /// Read every source afresh.
    pub fn sources(&self) -> SessionSources {
        SessionSources {
            identity: self.store.identity(),
            has_token: self.cache.token().is_some(),
            has_identity_blob: self.cache.has_identity_blob(),
            stored_role: self.cache.selected_role_tag(),
        }
    }

    /// Guard view under the active policy.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.sources().snapshot(self.policy)
    }

    /// Hold a pending identity in memory only; nothing is persisted until
    /// the code is verified.
    pub(crate) fn set_pending_identity(&self, identity: Identity) {
        self.store.replace_identity(Some(identity));
    }

    /// Install a verified identity in memory and mirror it durably.
    pub(crate) fn set_identity(&self, identity: Identity) {
        if let Err(error) = self.cache.store_identity(&identity) {
            warn!(%error, "failed to mirror identity to durable cache");
        }
        self.store.replace_identity(Some(identity));
    }

    /// Persist the role tag durably. Failures are logged.
    pub(crate) fn persist_role(&self, role: Role) {
        if let Err(error) = self.cache.store_role(role) {
            warn!(%error, %role, "failed to persist selected role");
        }
    }

    /// Merge `role` into the in-memory identity and refresh the blob.
    pub(crate) fn merge_role(&self, role: Role) -> Option<Identity> {
        let merged = self.store.merge_role(role)?;
        if let Err(error) = self.cache.store_identity(&merged) {
            warn!(%error, "failed to mirror role into durable identity");
        }
        Some(merged)
    }

    /// Record `error` in the stage error slot when it is user-facing.
    pub(crate) fn report(&self, error: StageError) -> StageError {
        if error.is_user_facing() {
            self.store.set_error(error.to_string());
        }
        error
    }

    pub(crate) fn forget_identity(&self) {
        self.store.replace_identity(None);
    }

    /// End the session.
    ///
    /// The remote call is best-effort; local state is always cleared and the
    /// caller is always sent to login. Only a concurrent logout fails.
    pub async fn logout(&self, api: &dyn AuthApi) -> Result<StageTransition, StageError> {
        let _loading = self.store.begin(Operation::Logout)?;
        if let Err(error) = api.logout().await {
            warn!(%error, "remote logout failed; clearing local session anyway");
        }
        if let Err(error) = self.cache.clear_session() {
            warn!(%error, "failed to clear durable session");
        }
        self.forget_identity();
        self.store.clear_error();
        info!("logged out");
        Ok(StageTransition::new(AppRoute::Login))
    }
}

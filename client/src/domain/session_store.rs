//! In-memory session record.
//!
//! The store owns the current identity, the per-operation loading set and the
//! transient error text. It is backed by a `tokio::sync::watch` channel so
//! observers (the profile prompt, a UI layer) see every change, while the
//! store itself remains the only writer.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use super::{Identity, Role, StageError};

/// Asynchronous operations tracked by the loading set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Phone login.
    Login,
    /// OTP verification.
    VerifyOtp,
    /// OTP resend.
    ResendOtp,
    /// Role submission.
    SelectRole,
    /// Logout.
    Logout,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Login => "login",
            Self::VerifyOtp => "otp verification",
            Self::ResendOtp => "otp resend",
            Self::SelectRole => "role selection",
            Self::Logout => "logout",
        };
        f.write_str(label)
    }
}

/// Snapshot of the in-memory session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    identity: Option<Identity>,
    in_flight: HashSet<Operation>,
    error: Option<String>,
}

impl SessionState {
    /// Current identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Whether `operation` is in flight.
    pub fn is_loading(&self, operation: Operation) -> bool {
        self.in_flight.contains(&operation)
    }

    /// Whether any operation is in flight.
    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Transient error text.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Shared handle to the in-memory session.
///
/// Cloning the handle shares the underlying record.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Empty, unauthenticated store.
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(sender),
        }
    }

    /// Copy of the current record.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Current identity.
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// Whether `operation` is in flight.
    pub fn is_loading(&self, operation: Operation) -> bool {
        self.state.borrow().is_loading(operation)
    }

    /// Transient error text.
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Watch every change to the record.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Replace the transient error text.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_if_modified(|state| {
            let changed = state.error.as_deref() != Some(message.as_str());
            state.error = Some(message);
            changed
        });
    }

    /// Clear the transient error text.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Claim the single-flight slot for `operation`.
    ///
    /// The slot is released when the returned guard drops.
    pub fn begin(&self, operation: Operation) -> Result<InFlight, StageError> {
        let claimed = self
            .state
            .send_if_modified(|state| state.in_flight.insert(operation));
        if !claimed {
            return Err(StageError::Busy { operation });
        }
        Ok(InFlight {
            store: self.clone(),
            operation,
        })
    }

    pub(crate) fn replace_identity(&self, identity: Option<Identity>) {
        self.state.send_if_modified(|state| {
            let changed = state.identity != identity;
            state.identity = identity;
            changed
        });
    }

    /// Merge `role` into the current identity; `None` when there is none.
    pub(crate) fn merge_role(&self, role: Role) -> Option<Identity> {
        let mut merged = None;
        self.state.send_if_modified(|state| match state.identity.as_mut() {
            Some(identity) => {
                let changed = identity.role() != Some(role);
                identity.set_role(role);
                merged = Some(identity.clone());
                changed
            }
            None => false,
        });
        merged
    }

    fn finish(&self, operation: Operation) {
        self.state
            .send_if_modified(|state| state.in_flight.remove(&operation));
    }
}

/// Guard holding an operation's loading slot.
#[derive(Debug)]
#[must_use = "the loading slot is released as soon as the guard drops"]
pub struct InFlight {
    store: SessionStore,
    operation: Operation,
}

impl InFlight {
    /// Operation this guard holds.
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.store.finish(self.operation);
    }
}

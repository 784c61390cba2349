//! Errors surfaced by the login, OTP and role-selection stages.
//!
//! Three failure families matter to callers: malformed local input
//! (`Validation`), missing session linkage (`State`, always paired with a
//! redirect to login) and remote rejection (`Remote`). `Busy` and
//! `Cancelled` cover the single-flight and teardown rules.

use thiserror::Error;

use super::ports::AuthApiError;
use super::{AppRoute, CredentialValidationError, Operation};

/// Message shown when the transport fails or the server gives no reason.
pub const NETWORK_ERROR_MESSAGE: &str = "network error";

/// Message shown when the pending identity has no user id.
pub const MISSING_USER_ID_MESSAGE: &str = "user id not found, please login again";

/// Stage failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// Local input is malformed; no request was sent.
    #[error("{0}")]
    Validation(CredentialValidationError),
    /// Required session linkage is missing; the caller must go to login.
    #[error("{message}")]
    State {
        /// User-facing explanation.
        message: String,
    },
    /// The server refused the operation, or could not be reached.
    #[error("{message}")]
    Remote {
        /// User-facing explanation.
        message: String,
    },
    /// The same operation is already in flight.
    #[error("{operation} is already in progress")]
    Busy {
        /// Operation holding the single-flight slot.
        operation: Operation,
    },
    /// The stage was torn down before the request finished.
    #[error("the screen was closed before the request finished")]
    Cancelled,
}

impl StageError {
    /// State error for a pending identity without a user id.
    pub fn missing_user_id() -> Self {
        Self::State {
            message: MISSING_USER_ID_MESSAGE.to_owned(),
        }
    }

    /// Remote error with an explicit message.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Forced navigation that accompanies this error, if any.
    pub fn redirect(&self) -> Option<AppRoute> {
        match self {
            Self::State { .. } => Some(AppRoute::Login),
            _ => None,
        }
    }

    /// Whether the message belongs in the stage's error slot.
    pub(crate) fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Busy { .. })
    }
}

impl From<CredentialValidationError> for StageError {
    fn from(value: CredentialValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<AuthApiError> for StageError {
    fn from(value: AuthApiError) -> Self {
        match value {
            AuthApiError::Rejected { message } if !message.trim().is_empty() => {
                Self::Remote { message }
            }
            AuthApiError::Rejected { .. } | AuthApiError::Transport { .. } => {
                Self::remote(NETWORK_ERROR_MESSAGE)
            }
        }
    }
}

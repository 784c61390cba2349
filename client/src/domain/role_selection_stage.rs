//! Role selection stage.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ports::AuthApi;
use super::{AppRoute, Operation, Role, Session, StageError, StageTransition};

/// Role picker state for a verified user without a role.
pub struct RoleSelectionStage {
    session: Session,
    api: Arc<dyn AuthApi>,
    selection: Option<Role>,
    cancel: CancellationToken,
}

impl RoleSelectionStage {
    /// Mount the stage.
    pub fn new(session: Session, api: Arc<dyn AuthApi>) -> Self {
        Self {
            session,
            api,
            selection: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Pick a tile. Clears any earlier error; nothing is sent yet.
    pub fn select(&mut self, role: Role) {
        self.session.store().clear_error();
        self.selection = Some(role);
    }

    /// Pending selection.
    pub fn selection(&self) -> Option<Role> {
        self.selection
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        self.selection.is_some() && !self.session.store().is_loading(Operation::SelectRole)
    }

    /// Stage error text.
    pub fn error(&self) -> Option<String> {
        self.session.store().error()
    }

    /// Tear the stage down, abandoning any in-flight request.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled when the stage is torn down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Send the selected role.
    ///
    /// Returns `None` when nothing is selected. On success the role is
    /// persisted durably first, then merged into the in-memory identity if
    /// there is one.
    pub async fn submit(&self) -> Option<Result<StageTransition, StageError>> {
        let role = self.selection?;
        Some(self.send(role).await)
    }

    async fn send(&self, role: Role) -> Result<StageTransition, StageError> {
        self.session.store().clear_error();
        let _loading = self.session.store().begin(Operation::SelectRole)?;

        let response = tokio::select! {
            () = self.cancel.cancelled() => return Err(StageError::Cancelled),
            response = self.api.select_role(role) => response,
        };
        response.map_err(|error| self.session.report(error.into()))?;

        self.session.persist_role(role);
        if self.session.merge_role(role).is_none() {
            warn!(%role, "no identity in memory to merge the selected role into");
        }
        info!(%role, "role selected");
        Ok(StageTransition::new(AppRoute::Home))
    }
}

impl Drop for RoleSelectionStage {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

//! OTP verification stage.
//!
//! Exchanges a four-digit code for the full identity and routes the user to
//! role selection or straight into the app. The resend countdown ticks on a
//! background task that stops with the stage.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ports::AuthApi;
use super::{
    AppRoute, Identity, NETWORK_ERROR_MESSAGE, NavigationState, Operation, OtpCode, OtpEntry,
    PhoneNumber, ResendCountdown, Session, StageError, StageTransition, UserId,
};

/// Which code is sent for verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OtpCodePolicy {
    /// The code the user typed.
    #[default]
    Entered,
    /// A fixed code, whatever was typed. Only for demo backends.
    Fixed(OtpCode),
}

/// OTP screen state.
pub struct OtpStage {
    session: Session,
    api: Arc<dyn AuthApi>,
    code_policy: OtpCodePolicy,
    carried_phone: Option<PhoneNumber>,
    entry: OtpEntry,
    countdown: ResendCountdown,
    cancel: CancellationToken,
    ticker: Option<JoinHandle<()>>,
}

impl OtpStage {
    /// Mount the stage.
    ///
    /// Without a carried phone and without a pending identity the stage
    /// refuses to mount and returns the login route instead.
    pub fn mount(
        session: Session,
        api: Arc<dyn AuthApi>,
        state: NavigationState,
        code_policy: OtpCodePolicy,
    ) -> Result<Self, AppRoute> {
        if state.phone.is_none() && session.identity().is_none() {
            warn!("otp stage opened without a phone; redirecting to login");
            return Err(AppRoute::Login);
        }
        Ok(Self {
            session,
            api,
            code_policy,
            carried_phone: state.phone,
            entry: OtpEntry::new(),
            countdown: ResendCountdown::new(),
            cancel: CancellationToken::new(),
            ticker: None,
        })
    }

    /// Start the once-per-second resend countdown.
    ///
    /// Calling it again while the ticker runs has no effect.
    pub fn start_countdown(&mut self) {
        if self.ticker.is_none() {
            self.ticker = Some(self.countdown.spawn_ticker(self.cancel.child_token()));
        }
    }

    /// Phone shown on the screen.
    pub fn phone(&self) -> Option<PhoneNumber> {
        self.carried_phone
            .clone()
            .or_else(|| self.session.identity().map(|identity| identity.mobile().clone()))
    }

    /// Entry cells.
    pub fn entry(&self) -> &OtpEntry {
        &self.entry
    }

    /// Resend countdown.
    pub fn countdown(&self) -> &ResendCountdown {
        &self.countdown
    }

    /// Stage error text.
    pub fn error(&self) -> Option<String> {
        self.session.store().error()
    }

    /// Whether `operation` is in flight.
    pub fn is_loading(&self, operation: Operation) -> bool {
        self.session.store().is_loading(operation)
    }

    /// Digit typed into cell `index`.
    pub fn input(&mut self, index: usize, value: &str) {
        self.entry.input(index, value);
    }

    /// Backspace in cell `index`.
    pub fn backspace(&mut self, index: usize) {
        self.entry.backspace(index);
    }

    /// Paste a whole code.
    pub fn paste(&mut self, code: &str) {
        self.entry.paste(code);
    }

    /// Token cancelled when the stage is torn down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tear the stage down: stop the countdown and abandon requests.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    fn pending_user(&self) -> Result<(UserId, Option<PhoneNumber>), StageError> {
        let identity = self.session.identity();
        let id = identity
            .as_ref()
            .map(|identity| identity.id().clone())
            .ok_or_else(|| self.session.report(StageError::missing_user_id()))?;
        let phone = identity
            .as_ref()
            .map(|identity| identity.mobile().clone())
            .or_else(|| self.carried_phone.clone());
        Ok((id, phone))
    }

    /// Verify the entered code.
    ///
    /// # Errors
    /// - [`StageError::Validation`] unless all four cells hold digits.
    /// - [`StageError::State`] when there is no pending user id; its
    ///   [`StageError::redirect`] points at login.
    /// - [`StageError::Remote`], [`StageError::Busy`] or
    ///   [`StageError::Cancelled`] as for login.
    pub async fn submit(&self) -> Result<StageTransition, StageError> {
        self.session.store().clear_error();
        let entered = self
            .entry
            .code()
            .map_err(|error| self.session.report(error.into()))?;
        let (user_id, phone) = self.pending_user()?;
        let _loading = self.session.store().begin(Operation::VerifyOtp)?;

        let code = match &self.code_policy {
            OtpCodePolicy::Entered => entered,
            OtpCodePolicy::Fixed(fixed) => fixed.clone(),
        };
        let response = tokio::select! {
            () = self.cancel.cancelled() => return Err(StageError::Cancelled),
            response = self.api.verify_otp(&user_id, &code) => response,
        };
        let fragment = response.map_err(|error| self.session.report(error.into()))?;
        let identity: Identity = fragment.into_identity(phone.as_ref()).map_err(|error| {
            warn!(%error, "verification response carried no usable identity");
            self.session.report(StageError::remote(NETWORK_ERROR_MESSAGE))
        })?;

        let role = identity.role();
        info!(user_id = %identity.id(), role = ?role, "otp verified");
        self.session.set_identity(identity);
        match role {
            Some(role) => {
                self.session.persist_role(role);
                Ok(StageTransition::new(AppRoute::Home))
            }
            None => Ok(StageTransition::new(AppRoute::SelectRole)),
        }
    }

    /// Ask for a new code.
    ///
    /// Returns `None` while the countdown is running: the action is not
    /// available yet. On success the countdown restarts.
    pub async fn resend(&self) -> Option<Result<(), StageError>> {
        if !self.countdown.can_resend() {
            return None;
        }
        Some(self.request_new_code().await)
    }

    async fn request_new_code(&self) -> Result<(), StageError> {
        self.session.store().clear_error();
        let (user_id, _) = self.pending_user()?;
        let _loading = self.session.store().begin(Operation::ResendOtp)?;

        let response = tokio::select! {
            () = self.cancel.cancelled() => return Err(StageError::Cancelled),
            response = self.api.generate_otp(&user_id) => response,
        };
        response.map_err(|error| self.session.report(error.into()))?;
        info!(user_id = %user_id, "otp resent");
        self.countdown.reset();
        Ok(())
    }
}

impl Drop for OtpStage {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

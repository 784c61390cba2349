//! Test utilities shared by unit and integration tests.
//!
//! Compiled only with the `test-support` feature, which the crate's own
//! dev-dependency enables.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{AuthApi, AuthApiError, LoginRequest};
use crate::domain::{IdentityFragment, OtpCode, Role, UserId};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded call against [`ScriptedAuthApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthCall {
    /// `login`
    Login(LoginRequest),
    /// `generate_otp`
    GenerateOtp(UserId),
    /// `verify_otp`
    VerifyOtp {
        /// User id sent.
        user_id: UserId,
        /// Code sent.
        code: OtpCode,
    },
    /// `select_role`
    SelectRole(Role),
    /// `logout`
    Logout,
}

type Script<T> = Mutex<VecDeque<Result<T, AuthApiError>>>;

/// [`AuthApi`] double that replays queued responses and records calls.
///
/// Unscripted `login` and `verify_otp` calls fail with a transport error;
/// unscripted acknowledgements succeed.
#[derive(Debug, Default)]
pub struct ScriptedAuthApi {
    login: Script<IdentityFragment>,
    verify: Script<IdentityFragment>,
    generate: Script<()>,
    select_role: Script<()>,
    logout: Script<()>,
    calls: Mutex<Vec<AuthCall>>,
}

impl ScriptedAuthApi {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a `login` response.
    pub fn push_login(&self, response: Result<IdentityFragment, AuthApiError>) {
        lock(&self.login).push_back(response);
    }

    /// Queue a `verify_otp` response.
    pub fn push_verify(&self, response: Result<IdentityFragment, AuthApiError>) {
        lock(&self.verify).push_back(response);
    }

    /// Queue a `generate_otp` response.
    pub fn push_generate_otp(&self, response: Result<(), AuthApiError>) {
        lock(&self.generate).push_back(response);
    }

    /// Queue a `select_role` response.
    pub fn push_select_role(&self, response: Result<(), AuthApiError>) {
        lock(&self.select_role).push_back(response);
    }

    /// Queue a `logout` response.
    pub fn push_logout(&self, response: Result<(), AuthApiError>) {
        lock(&self.logout).push_back(response);
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<AuthCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: AuthCall) {
        lock(&self.calls).push(call);
    }
}

fn next_data(script: &Script<IdentityFragment>, operation: &str) -> Result<IdentityFragment, AuthApiError> {
    lock(script)
        .pop_front()
        .unwrap_or_else(|| Err(AuthApiError::transport(format!("unscripted {operation}"))))
}

fn next_ack(script: &Script<()>) -> Result<(), AuthApiError> {
    lock(script).pop_front().unwrap_or(Ok(()))
}

#[async_trait]
impl AuthApi for ScriptedAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<IdentityFragment, AuthApiError> {
        self.record(AuthCall::Login(request.clone()));
        next_data(&self.login, "login")
    }

    async fn generate_otp(&self, user_id: &UserId) -> Result<(), AuthApiError> {
        self.record(AuthCall::GenerateOtp(user_id.clone()));
        next_ack(&self.generate)
    }

    async fn verify_otp(
        &self,
        user_id: &UserId,
        code: &OtpCode,
    ) -> Result<IdentityFragment, AuthApiError> {
        self.record(AuthCall::VerifyOtp {
            user_id: user_id.clone(),
            code: code.clone(),
        });
        next_data(&self.verify, "verify_otp")
    }

    async fn select_role(&self, role: Role) -> Result<(), AuthApiError> {
        self.record(AuthCall::SelectRole(role));
        next_ack(&self.select_role)
    }

    async fn logout(&self) -> Result<(), AuthApiError> {
        self.record(AuthCall::Logout);
        next_ack(&self.logout)
    }
}

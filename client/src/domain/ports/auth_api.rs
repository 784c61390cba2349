//! Driven port for the remote authentication endpoints.
//!
//! The stages only see this trait, so tests substitute a double and the
//! transport (HTTP today) stays an outbound concern.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::domain::{DeviceId, IdentityFragment, OtpCode, PhoneNumber, Role, UserId};

use super::define_port_error;

/// Payload for the login call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginRequest {
    /// Validated mobile number.
    pub phone: PhoneNumber,
    /// Cached device identifier.
    pub device_id: DeviceId,
    /// Best-effort public address.
    pub ip: IpAddr,
    /// Device type tag.
    pub device_type: String,
    /// Placeholder latitude.
    pub latitude: f64,
    /// Placeholder longitude.
    pub longitude: f64,
}

define_port_error! {
    /// Errors raised by authentication adapters.
    pub enum AuthApiError {
        /// The server answered and refused the operation.
        Rejected { message: String } => "{message}",
        /// The request never produced a usable answer.
        Transport { message: String } => "auth transport failed: {message}",
    }
}

/// Port for the authentication endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Start a login for a phone number and return the pending identity.
    async fn login(&self, request: &LoginRequest) -> Result<IdentityFragment, AuthApiError>;

    /// Ask the server to send a new one-time code.
    async fn generate_otp(&self, user_id: &UserId) -> Result<(), AuthApiError>;

    /// Exchange a one-time code for the full identity.
    async fn verify_otp(
        &self,
        user_id: &UserId,
        code: &OtpCode,
    ) -> Result<IdentityFragment, AuthApiError>;

    /// Record the chosen role for the current user.
    async fn select_role(&self, role: Role) -> Result<(), AuthApiError>;

    /// End the server-side session.
    async fn logout(&self) -> Result<(), AuthApiError>;
}

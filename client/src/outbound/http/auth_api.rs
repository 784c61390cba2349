//! Reqwest-backed authentication adapter.
//!
//! Owns transport details only: endpoint paths, bearer headers, envelope
//! decoding and the mapping of HTTP failures onto [`AuthApiError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{EnvelopeDto, LoginBodyDto, SelectRoleBodyDto, UserIdBodyDto, VerifyOtpBodyDto};
use crate::domain::ports::{AuthApi, AuthApiError, LoginRequest};
use crate::domain::{IdentityFragment, OtpCode, Role, SessionCache, UserId};

const LOGIN_PATH: &str = "auth/login";
const GENERATE_OTP_PATH: &str = "auth/generate-otp";
const VERIFY_OTP_PATH: &str = "auth/verify-otp";
const SELECT_ROLE_PATH: &str = "auth/select-role";
const LOGOUT_PATH: &str = "auth/logout";

/// Authentication API client for one backend.
pub struct HttpAuthApi {
    client: Client,
    base: Url,
    cache: SessionCache,
}

impl HttpAuthApi {
    /// Build an adapter for `base` with a per-request timeout.
    ///
    /// The session token, when cached, is sent as a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration, cache: SessionCache) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
            cache,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthApiError> {
        self.base
            .join(path)
            .map_err(|error| AuthApiError::transport(format!("invalid endpoint {path}: {error}")))
    }

    async fn post(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<(StatusCode, Vec<u8>), AuthApiError> {
        let mut request = self.client.post(self.endpoint(path)?).json(body);
        if let Some(token) = self.cache.token() {
            request = request.bearer_auth(token.expose());
        }
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        debug!(path, status = status.as_u16(), "auth api responded");
        Ok((status, bytes.to_vec()))
    }

    async fn post_for_data<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, AuthApiError> {
        let (status, bytes) = self.post(path, body).await?;
        decode_data(status, &bytes)
    }

    async fn post_ack(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<(), AuthApiError> {
        let (status, bytes) = self.post(path, body).await?;
        check_status(status, &bytes)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<IdentityFragment, AuthApiError> {
        self.post_for_data(LOGIN_PATH, &LoginBodyDto::from(request)).await
    }

    async fn generate_otp(&self, user_id: &UserId) -> Result<(), AuthApiError> {
        let body = UserIdBodyDto {
            user_id: user_id.as_ref(),
        };
        self.post_ack(GENERATE_OTP_PATH, &body).await
    }

    async fn verify_otp(
        &self,
        user_id: &UserId,
        code: &OtpCode,
    ) -> Result<IdentityFragment, AuthApiError> {
        let body = VerifyOtpBodyDto {
            user_id: user_id.as_ref(),
            otp: code.as_str(),
        };
        self.post_for_data(VERIFY_OTP_PATH, &body).await
    }

    async fn select_role(&self, role: Role) -> Result<(), AuthApiError> {
        let body = SelectRoleBodyDto {
            user_type: role.as_str(),
        };
        self.post_ack(SELECT_ROLE_PATH, &body).await
    }

    async fn logout(&self) -> Result<(), AuthApiError> {
        self.post_ack(LOGOUT_PATH, &serde_json::json!({})).await
    }
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn map_transport_error(error: reqwest::Error) -> AuthApiError {
    AuthApiError::transport(error.to_string())
}

/// Server message from an error envelope; empty when there is none.
fn rejection_message(body: &[u8]) -> String {
    serde_json::from_slice::<EnvelopeDto<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_default()
}

fn check_status(status: StatusCode, body: &[u8]) -> Result<(), AuthApiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AuthApiError::rejected(rejection_message(body)))
    }
}

fn decode_data<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, AuthApiError> {
    check_status(status, body)?;
    let envelope: EnvelopeDto<T> = serde_json::from_slice(body).map_err(|error| {
        AuthApiError::transport(format!("invalid auth response payload: {error}"))
    })?;
    envelope
        .data
        .ok_or_else(|| AuthApiError::transport("auth response carried no data"))
}

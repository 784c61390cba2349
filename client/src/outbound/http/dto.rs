//! Wire DTOs for the authentication API.
//!
//! Every response is wrapped in a `{ "message", "data" }` envelope; request
//! bodies use camelCase field names.

use serde::{Deserialize, Serialize};

use crate::domain::ports::LoginRequest;

#[derive(Debug, Deserialize)]
pub(super) struct EnvelopeDto<T> {
    #[serde(default)]
    pub(super) message: Option<String>,
    pub(super) data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LoginBodyDto<'a> {
    pub(super) mobile: &'a str,
    pub(super) device_id: &'a str,
    pub(super) ip: String,
    pub(super) device_type: &'a str,
    pub(super) latitude: f64,
    pub(super) longitude: f64,
}

impl<'a> From<&'a LoginRequest> for LoginBodyDto<'a> {
    fn from(request: &'a LoginRequest) -> Self {
        Self {
            mobile: request.phone.as_str(),
            device_id: request.device_id.as_str(),
            ip: request.ip.to_string(),
            device_type: request.device_type.as_str(),
            latitude: request.latitude,
            longitude: request.longitude,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserIdBodyDto<'a> {
    pub(super) user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VerifyOtpBodyDto<'a> {
    pub(super) user_id: &'a str,
    pub(super) otp: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SelectRoleBodyDto<'a> {
    pub(super) user_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct PublicIpDto {
    pub(super) ip: String,
}

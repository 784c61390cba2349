//! Client configuration loaded via OrthoConfig.
//!
//! Every field is optional in the environment and config files; accessors
//! apply defaults and turn raw strings into domain types.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{
    AuthorizationPolicy, DEFAULT_DEVICE_TYPE, DeviceProfile, FALLBACK_IP, OtpCode, OtpCodePolicy,
};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/";
const DEFAULT_STORAGE_DIR: &str = ".market-client";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors raised while interpreting configured values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A URL setting did not parse.
    #[error("invalid {field}: {message}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Parser message.
        message: String,
    },
    /// The fallback IP did not parse.
    #[error("invalid fallback_ip '{value}'")]
    InvalidIp {
        /// Raw value.
        value: String,
    },
    /// The fixed OTP code is not four digits.
    #[error("otp_fixed_code must be exactly 4 digits")]
    InvalidOtpCode,
    /// The authorisation policy tag is unknown.
    #[error("{0}")]
    InvalidPolicy(String),
}

/// Configuration values for the session client.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MARKET_CLIENT")]
pub struct ClientSettings {
    /// Base URL of the authentication API.
    pub api_base_url: Option<String>,
    /// Endpoint answering `{ "ip": "..." }`; the fallback IP is used when unset.
    pub ip_lookup_url: Option<String>,
    /// Directory holding the durable session files.
    pub storage_dir: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Device type tag sent with login.
    pub device_type: Option<String>,
    /// Placeholder latitude sent with login.
    pub latitude: Option<f64>,
    /// Placeholder longitude sent with login.
    pub longitude: Option<f64>,
    /// Address reported when the public IP lookup fails.
    pub fallback_ip: Option<String>,
    /// Fixed code sent instead of the entered one. Demo backends only.
    ///
    /// Environment values such as `0042` arrive as integers, so numbers are
    /// accepted and zero-padded back to four digits.
    #[serde(default, deserialize_with = "fixed_code::deserialize")]
    pub otp_fixed_code: Option<String>,
    /// `reconciled` or `any-source`.
    pub authorization_policy: Option<String>,
    /// Emit JSON log lines.
    #[ortho_config(default = false)]
    pub json_logs: bool,
}

mod fixed_code {
    use std::fmt;

    use serde::Deserializer;
    use serde::de::{self, Visitor};

    use crate::domain::OTP_DIGITS;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FixedCodeVisitor;

        impl<'de> Visitor<'de> for FixedCodeVisitor {
            type Value = Option<String>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 4-digit code as a string or an integer")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Some(value.to_owned()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Some(format!("{value:0width$}", width = OTP_DIGITS)))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let unsigned = u64::try_from(value)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))?;
                self.visit_u64(unsigned)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }
        }

        deserializer.deserialize_any(FixedCodeVisitor)
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw.trim()).map_err(|error| SettingsError::InvalidUrl {
        field,
        message: error.to_string(),
    })
}

impl ClientSettings {
    /// API base URL, falling back to a local backend.
    pub fn api_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "api_base_url",
            self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL),
        )
    }

    /// IP lookup endpoint, if configured.
    pub fn ip_lookup_url(&self) -> Result<Option<Url>, SettingsError> {
        self.ip_lookup_url
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_url("ip_lookup_url", raw))
            .transpose()
    }

    /// Session directory.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
    }

    /// Request timeout; zero is raised to one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                .max(1),
        )
    }

    /// Device attributes for login requests.
    pub fn device_profile(&self) -> Result<DeviceProfile, SettingsError> {
        let fallback_ip = match self.fallback_ip.as_deref() {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| SettingsError::InvalidIp {
                    value: raw.to_owned(),
                })?,
            None => FALLBACK_IP,
        };
        Ok(DeviceProfile {
            device_type: self
                .device_type
                .clone()
                .filter(|tag| !tag.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEVICE_TYPE.to_owned()),
            latitude: self.latitude.unwrap_or_default(),
            longitude: self.longitude.unwrap_or_default(),
            fallback_ip,
        })
    }

    /// Which OTP code is sent for verification.
    pub fn otp_code_policy(&self) -> Result<OtpCodePolicy, SettingsError> {
        match self.otp_fixed_code.as_deref() {
            Some(raw) => OtpCode::parse(raw.trim())
                .map(OtpCodePolicy::Fixed)
                .map_err(|_| SettingsError::InvalidOtpCode),
            None => Ok(OtpCodePolicy::Entered),
        }
    }

    /// Authorisation policy, `reconciled` unless configured.
    pub fn authorization_policy(&self) -> Result<AuthorizationPolicy, SettingsError> {
        match self.authorization_policy.as_deref() {
            Some(raw) => raw
                .parse::<AuthorizationPolicy>()
                .map_err(|error| SettingsError::InvalidPolicy(error.to_string())),
            None => Ok(AuthorizationPolicy::default()),
        }
    }
}

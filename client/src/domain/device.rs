//! Device metadata sent with every login request.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use uuid::Uuid;

/// Locally generated identifier for this device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuse a stored identifier, rejecting blank values.
    pub fn from_stored(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device type tag sent when nothing else is configured.
pub const DEFAULT_DEVICE_TYPE: &str = "web";

/// Address reported when the public IP lookup fails.
pub const FALLBACK_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Fixed device attributes attached to login requests.
///
/// Coordinates are placeholders: the client never asks for a real location.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    /// Device type tag, e.g. `web`.
    pub device_type: String,
    /// Placeholder latitude.
    pub latitude: f64,
    /// Placeholder longitude.
    pub longitude: f64,
    /// Address used when the public IP cannot be resolved.
    pub fallback_ip: IpAddr,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            device_type: DEFAULT_DEVICE_TYPE.to_owned(),
            latitude: 0.0,
            longitude: 0.0,
            fallback_ip: FALLBACK_IP,
        }
    }
}

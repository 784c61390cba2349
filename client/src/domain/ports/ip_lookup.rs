//! Driven port resolving the device's public IP address.

use std::net::IpAddr;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by IP lookup adapters.
    pub enum IpLookupError {
        /// The lookup service could not be reached or answered badly.
        Unavailable { message: String } => "public ip lookup failed: {message}",
    }
}

/// Port for public IP resolution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpLookup: Send + Sync {
    /// Resolve the address the outside world sees for this device.
    async fn public_ip(&self) -> Result<IpAddr, IpLookupError>;
}

/// Lookup that always answers with a fixed address.
///
/// Used when no lookup endpoint is configured.
#[derive(Debug, Clone, Copy)]
pub struct FixtureIpLookup(IpAddr);

impl FixtureIpLookup {
    /// Lookup returning `ip`.
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }
}

#[async_trait]
impl IpLookup for FixtureIpLookup {
    async fn public_ip(&self) -> Result<IpAddr, IpLookupError> {
        Ok(self.0)
    }
}

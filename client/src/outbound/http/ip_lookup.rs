//! Reqwest-backed public IP lookup.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::dto::PublicIpDto;
use crate::domain::ports::{IpLookup, IpLookupError};

/// Lookup against a `{ "ip": "..." }` JSON endpoint.
pub struct HttpIpLookup {
    client: Client,
    endpoint: Url,
}

impl HttpIpLookup {
    /// Build a lookup for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn public_ip(&self) -> Result<IpAddr, IpLookupError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| IpLookupError::unavailable(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IpLookupError::unavailable(format!(
                "status {}",
                status.as_u16()
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|error| IpLookupError::unavailable(error.to_string()))?;
        parse_ip(body.as_ref())
    }
}

fn parse_ip(body: &[u8]) -> Result<IpAddr, IpLookupError> {
    let decoded: PublicIpDto = serde_json::from_slice(body)
        .map_err(|error| IpLookupError::unavailable(format!("invalid lookup payload: {error}")))?;
    decoded
        .ip
        .trim()
        .parse()
        .map_err(|error| IpLookupError::unavailable(format!("invalid address: {error}")))
}

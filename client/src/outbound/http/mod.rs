//! HTTP outbound adapters.
//!
//! Thin `reqwest` implementations of the `AuthApi` and `IpLookup` ports.

mod auth_api;
mod dto;
mod ip_lookup;

pub use auth_api::HttpAuthApi;
pub use ip_lookup::HttpIpLookup;

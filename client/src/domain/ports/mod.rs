//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_api;
mod durable_store;
mod ip_lookup;

#[cfg(test)]
pub use auth_api::MockAuthApi;
pub use auth_api::{AuthApi, AuthApiError, LoginRequest};
#[cfg(test)]
pub use durable_store::MockDurableStore;
pub use durable_store::{DurableStore, DurableStoreError, MemoryDurableStore, StorageKey};
#[cfg(test)]
pub use ip_lookup::MockIpLookup;
pub use ip_lookup::{FixtureIpLookup, IpLookup, IpLookupError};

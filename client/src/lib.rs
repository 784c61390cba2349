//! Session establishment and access control for the marketplace client.

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(feature = "test-support")]
pub mod test_support;

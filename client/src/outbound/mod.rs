//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **storage**: file-backed durable session cache using `cap-std`
//! - **http**: `reqwest` clients for the authentication API and the public
//!   IP lookup
//!
//! Adapters are thin translators between domain types and wire or disk
//! representations. They contain no session rules.

pub mod http;
pub mod storage;

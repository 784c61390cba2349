//! Marketplace role tags.
//!
//! A role is chosen once per session and then drives every role-gated route
//! decision. Tags travel as upper-case strings (`FARMER`, `FPO`, `BUYER`,
//! `AGROSHOP`) both on the wire and in durable storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors returned when parsing a role tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleParseError {
    /// The tag was empty once trimmed.
    Empty,
    /// The tag did not name one of the known roles.
    Unknown(String),
}

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "role tag must not be empty"),
            Self::Unknown(tag) => write!(
                f,
                "unknown role tag '{tag}'; expected FARMER, FPO, BUYER or AGROSHOP"
            ),
        }
    }
}

impl std::error::Error for RoleParseError {}

/// Marketplace participant role.
///
/// ## Invariants
/// - Parsing is case-insensitive and ignores surrounding whitespace; the
///   canonical form is always upper case.
///
/// # Examples
/// ```
/// use client::domain::Role;
///
/// let role: Role = " farmer ".parse().expect("known role");
/// assert_eq!(role, Role::Farmer);
/// assert_eq!(role.as_str(), "FARMER");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Individual grower selling produce.
    Farmer,
    /// Farmer-producer organisation.
    Fpo,
    /// Bulk buyer posting requirements.
    Buyer,
    /// Agricultural input shop.
    Agroshop,
}

/// Roles allowed to sell crops and browse buyers.
pub const PRODUCER_ROLES: &[Role] = &[Role::Farmer, Role::Fpo];

/// Roles allowed to post purchase requirements.
pub const PURCHASER_ROLES: &[Role] = &[Role::Buyer, Role::Agroshop];

impl Role {
    /// Every role in display order.
    pub const ALL: [Self; 4] = [Self::Farmer, Self::Fpo, Self::Buyer, Self::Agroshop];

    /// Canonical upper-case tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Farmer => "FARMER",
            Self::Fpo => "FPO",
            Self::Buyer => "BUYER",
            Self::Agroshop => "AGROSHOP",
        }
    }

    /// Parse a tag, normalising case and whitespace.
    pub fn parse_tag(raw: &str) -> Result<Self, RoleParseError> {
        let normalised = raw.trim().to_ascii_uppercase();
        match normalised.as_str() {
            "" => Err(RoleParseError::Empty),
            "FARMER" => Ok(Self::Farmer),
            "FPO" => Ok(Self::Fpo),
            "BUYER" => Ok(Self::Buyer),
            "AGROSHOP" => Ok(Self::Agroshop),
            _ => Err(RoleParseError::Unknown(raw.trim().to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_tag(s)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_owned()
    }
}

impl TryFrom<String> for Role {
    type Error = RoleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_tag(&value)
    }
}

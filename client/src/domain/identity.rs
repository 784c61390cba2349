//! Identity record held by the session.
//!
//! The server speaks in loosely-populated JSON fragments (`_id`, `mobile`,
//! `userType`, ...). [`IdentityFragment`] mirrors that wire shape and
//! [`Identity`] is the validated record the rest of the crate works with.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{CredentialValidationError, PhoneNumber, Role, RoleParseError};

/// Validation errors returned while building an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityValidationError {
    /// The user id was missing or blank.
    EmptyId,
    /// No phone number was supplied by the record or the caller.
    MissingPhone,
    /// The phone number was malformed.
    InvalidPhone(CredentialValidationError),
    /// The role tag was not recognised.
    InvalidRole(RoleParseError),
}

impl fmt::Display for IdentityValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::MissingPhone => write!(f, "identity must carry a phone number"),
            Self::InvalidPhone(err) => write!(f, "identity phone is invalid: {err}"),
            Self::InvalidRole(err) => write!(f, "identity role is invalid: {err}"),
        }
    }
}

impl std::error::Error for IdentityValidationError {}

/// Server-assigned user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentityValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Opaque session token handed out by the server.
///
/// The value is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    /// Wrap a token, returning `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(Zeroizing::new(raw)))
    }

    /// Borrow the raw token for transport headers.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Identity data as returned by the server or stored in the durable blob.
///
/// Every field is optional so partial login responses still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityFragment {
    /// Server user id.
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Mobile number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Session token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Role tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Avatar URL, used only for presentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    /// Free-form location, used only for presentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

impl IdentityFragment {
    /// Validate the fragment, using `fallback_phone` when it carries none.
    ///
    /// # Examples
    /// ```
    /// use client::domain::{IdentityFragment, PhoneNumber};
    ///
    /// let fragment = IdentityFragment {
    ///     id: Some("u1".to_owned()),
    ///     ..IdentityFragment::default()
    /// };
    /// let phone = PhoneNumber::parse("9876543210").unwrap();
    /// let identity = fragment.into_identity(Some(&phone)).unwrap();
    /// assert_eq!(identity.mobile(), &phone);
    /// ```
    pub fn into_identity(
        self,
        fallback_phone: Option<&PhoneNumber>,
    ) -> Result<Identity, IdentityValidationError> {
        let id = UserId::new(self.id.unwrap_or_default())?;
        let mobile = match non_blank(self.mobile) {
            Some(raw) => PhoneNumber::parse(raw.trim()).map_err(IdentityValidationError::InvalidPhone)?,
            None => fallback_phone
                .cloned()
                .ok_or(IdentityValidationError::MissingPhone)?,
        };
        let role = non_blank(self.user_type)
            .map(|tag| Role::parse_tag(&tag))
            .transpose()
            .map_err(IdentityValidationError::InvalidRole)?;

        Ok(Identity {
            id,
            mobile,
            first_name: non_blank(self.first_name),
            last_name: non_blank(self.last_name),
            token: self.token.and_then(SessionToken::new),
            role,
            profile_image: non_blank(self.profile_image),
            location: non_blank(self.location),
        })
    }
}

/// Authenticated user's profile snapshot.
///
/// ## Invariants
/// - `id` is non-empty.
/// - `mobile` is a valid ten-digit number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityFragment", into = "IdentityFragment")]
pub struct Identity {
    id: UserId,
    mobile: PhoneNumber,
    first_name: Option<String>,
    last_name: Option<String>,
    token: Option<SessionToken>,
    role: Option<Role>,
    profile_image: Option<String>,
    location: Option<String>,
}

impl Identity {
    /// Minimal identity with only the mandatory fields.
    pub fn new(id: UserId, mobile: PhoneNumber) -> Self {
        Self {
            id,
            mobile,
            first_name: None,
            last_name: None,
            token: None,
            role: None,
            profile_image: None,
            location: None,
        }
    }

    /// Attach first and last names.
    #[must_use]
    pub fn with_names(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = non_blank(Some(first.into()));
        self.last_name = non_blank(Some(last.into()));
        self
    }

    /// Attach a session token.
    #[must_use]
    pub fn with_token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Attach a role.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Server user id.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Mobile number.
    pub fn mobile(&self) -> &PhoneNumber {
        &self.mobile
    }

    /// Given name, if known.
    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    /// Family name, if known.
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Session token, if the identity has been verified.
    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Assigned role, if any.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Avatar URL.
    pub fn profile_image(&self) -> Option<&str> {
        self.profile_image.as_deref()
    }

    /// Free-form location.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Whether both first and last name are present once trimmed.
    pub fn is_profile_complete(&self) -> bool {
        let filled = |name: Option<&str>| name.is_some_and(|text| !text.trim().is_empty());
        filled(self.first_name()) && filled(self.last_name())
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }
}

impl From<Identity> for IdentityFragment {
    fn from(value: Identity) -> Self {
        Self {
            id: Some(value.id.into()),
            mobile: Some(value.mobile.into()),
            first_name: value.first_name,
            last_name: value.last_name,
            token: value.token.map(|token| token.expose().to_owned()),
            user_type: value.role.map(String::from),
            profile_image: value.profile_image,
            location: value.location,
        }
    }
}

impl TryFrom<IdentityFragment> for Identity {
    type Error = IdentityValidationError;

    fn try_from(value: IdentityFragment) -> Result<Self, Self::Error> {
        value.into_identity(None)
    }
}

#[cfg(test)]
mod tests;

//! Typed route table.
//!
//! Every screen the client can show is an [`AppRoute`]. Each route knows its
//! canonical path and which guard protects it; unknown paths do not parse and
//! the router sends them home.

use std::borrow::Cow;
use std::fmt;

use super::{PRODUCER_ROLES, PURCHASER_ROLES, PhoneNumber, Role};

/// Public entry pages handled by the redirect guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPage {
    /// `/login`
    Login,
    /// `/verify-otp`
    VerifyOtp,
    /// `/select-role`
    SelectRole,
}

/// How a route is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Public entry page, kept away from authorised sessions.
    Public(AuthPage),
    /// Requires an authorised session with a role, optionally from a set.
    Protected {
        /// Roles allowed in; `None` admits every role.
        allowed: Option<&'static [Role]>,
    },
}

/// Application routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppRoute {
    /// `/login`
    Login,
    /// `/verify-otp`
    VerifyOtp,
    /// `/select-role`
    SelectRole,
    /// `/`
    Home,
    /// `/favorites`
    Favorites,
    /// `/community`
    Community,
    /// `/profile`
    Profile,
    /// `/edit-profile`
    EditProfile,
    /// `/requirement/:id`
    Requirement {
        /// Requirement identifier.
        id: String,
    },
    /// `/sell`
    Sell,
    /// `/my-crops`
    MyCrops,
    /// `/buyers`
    Buyers,
    /// `/post-requirement`
    PostRequirement,
    /// `/marketplace`
    Marketplace,
    /// `/agroshop`
    Agroshop,
    /// `/agroshop/:id`
    AgroshopDetail {
        /// Shop identifier.
        id: String,
    },
}

impl AppRoute {
    /// Parse a location path. Query strings, fragments and a trailing slash
    /// are ignored.
    ///
    /// # Examples
    /// ```
    /// use client::domain::AppRoute;
    ///
    /// assert_eq!(AppRoute::parse("/sell?tab=1"), Some(AppRoute::Sell));
    /// assert_eq!(
    ///     AppRoute::parse("/agroshop/42"),
    ///     Some(AppRoute::AgroshopDetail { id: "42".to_owned() })
    /// );
    /// assert_eq!(AppRoute::parse("/nowhere"), None);
    /// ```
    pub fn parse(location: &str) -> Option<Self> {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let segments: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["verify-otp"] => Self::VerifyOtp,
            ["select-role"] => Self::SelectRole,
            ["favorites"] => Self::Favorites,
            ["community"] => Self::Community,
            ["profile"] => Self::Profile,
            ["edit-profile"] => Self::EditProfile,
            ["requirement", id] => Self::Requirement {
                id: (*id).to_owned(),
            },
            ["sell"] => Self::Sell,
            ["my-crops"] => Self::MyCrops,
            ["buyers"] => Self::Buyers,
            ["post-requirement"] => Self::PostRequirement,
            ["marketplace"] => Self::Marketplace,
            ["agroshop"] => Self::Agroshop,
            ["agroshop", id] => Self::AgroshopDetail {
                id: (*id).to_owned(),
            },
            _ => return None,
        };
        Some(route)
    }

    /// Canonical path.
    pub fn path(&self) -> Cow<'static, str> {
        let fixed = match self {
            Self::Login => "/login",
            Self::VerifyOtp => "/verify-otp",
            Self::SelectRole => "/select-role",
            Self::Home => "/",
            Self::Favorites => "/favorites",
            Self::Community => "/community",
            Self::Profile => "/profile",
            Self::EditProfile => "/edit-profile",
            Self::Sell => "/sell",
            Self::MyCrops => "/my-crops",
            Self::Buyers => "/buyers",
            Self::PostRequirement => "/post-requirement",
            Self::Marketplace => "/marketplace",
            Self::Agroshop => "/agroshop",
            Self::Requirement { id } => return Cow::Owned(format!("/requirement/{id}")),
            Self::AgroshopDetail { id } => return Cow::Owned(format!("/agroshop/{id}")),
        };
        Cow::Borrowed(fixed)
    }

    /// Guard configuration for this route.
    pub fn access(&self) -> RouteAccess {
        match self {
            Self::Login => RouteAccess::Public(AuthPage::Login),
            Self::VerifyOtp => RouteAccess::Public(AuthPage::VerifyOtp),
            Self::SelectRole => RouteAccess::Public(AuthPage::SelectRole),
            Self::Sell | Self::MyCrops | Self::Buyers => RouteAccess::Protected {
                allowed: Some(PRODUCER_ROLES),
            },
            Self::PostRequirement => RouteAccess::Protected {
                allowed: Some(PURCHASER_ROLES),
            },
            Self::Home
            | Self::Favorites
            | Self::Community
            | Self::Profile
            | Self::EditProfile
            | Self::Requirement { .. }
            | Self::Marketplace
            | Self::Agroshop
            | Self::AgroshopDetail { .. } => RouteAccess::Protected { allowed: None },
        }
    }
}

impl fmt::Display for AppRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Data carried alongside a navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Phone number entered on the login page.
    pub phone: Option<PhoneNumber>,
}

/// Navigation requested by a stage after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransition {
    /// Destination route.
    pub to: AppRoute,
    /// State handed to the destination.
    pub state: NavigationState,
}

impl StageTransition {
    /// Plain navigation to `to`.
    pub fn new(to: AppRoute) -> Self {
        Self {
            to,
            state: NavigationState::default(),
        }
    }

    /// Navigation to `to` carrying `phone`.
    pub fn with_phone(to: AppRoute, phone: PhoneNumber) -> Self {
        Self {
            to,
            state: NavigationState { phone: Some(phone) },
        }
    }
}

//! Route and auth-page guards plus the router that applies them.
//!
//! Guard decisions are pure functions of a [`SessionSnapshot`]; the router
//! takes a fresh snapshot on every navigation and never caches a decision.

use tracing::{debug, warn};

use super::{AppRoute, AuthPage, Role, RouteAccess, Session, SessionSnapshot};

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the requested page.
    Render,
    /// Send the user elsewhere.
    Redirect(AppRoute),
}

/// Decide access to a protected route.
///
/// # Examples
/// ```
/// use client::domain::{evaluate_route_guard, AppRoute, GuardDecision, SessionSnapshot};
///
/// let snapshot = SessionSnapshot::default();
/// assert_eq!(
///     evaluate_route_guard(&snapshot, None),
///     GuardDecision::Redirect(AppRoute::Login)
/// );
/// ```
pub fn evaluate_route_guard(snapshot: &SessionSnapshot, allowed: Option<&[Role]>) -> GuardDecision {
    if !snapshot.authorized {
        return GuardDecision::Redirect(AppRoute::Login);
    }
    if !snapshot.has_role() {
        return GuardDecision::Redirect(AppRoute::SelectRole);
    }
    match allowed {
        Some(roles) if !snapshot.role_in(roles) => GuardDecision::Redirect(AppRoute::Home),
        _ => GuardDecision::Render,
    }
}

/// Decide access to a public entry page.
pub fn evaluate_auth_page_guard(snapshot: &SessionSnapshot, page: AuthPage) -> GuardDecision {
    match page {
        AuthPage::SelectRole if !snapshot.authorized => GuardDecision::Redirect(AppRoute::Login),
        AuthPage::SelectRole if snapshot.has_role() => GuardDecision::Redirect(AppRoute::Home),
        AuthPage::SelectRole => GuardDecision::Render,
        AuthPage::Login | AuthPage::VerifyOtp if snapshot.authorized && snapshot.has_role() => {
            GuardDecision::Redirect(AppRoute::Home)
        }
        AuthPage::Login | AuthPage::VerifyOtp => GuardDecision::Render,
    }
}

/// Apply the guard matching `route`.
pub fn evaluate(snapshot: &SessionSnapshot, route: &AppRoute) -> GuardDecision {
    match route.access() {
        RouteAccess::Public(page) => evaluate_auth_page_guard(snapshot, page),
        RouteAccess::Protected { allowed } => evaluate_route_guard(snapshot, allowed),
    }
}

/// Redirects followed before the router gives up and shows login.
pub const MAX_REDIRECTS: usize = 4;

/// Result of resolving a location to the page actually shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Page that renders.
    pub route: AppRoute,
    /// Routes passed through on the way, in order.
    pub redirects: Vec<AppRoute>,
}

impl Navigation {
    /// Whether the requested page rendered directly.
    pub fn is_direct(&self) -> bool {
        self.redirects.is_empty()
    }
}

/// Maps locations to guarded routes.
#[derive(Debug, Clone)]
pub struct Router {
    session: Session,
}

impl Router {
    /// Router reading from `session`.
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Single guard step for `location`. Unknown paths redirect home.
    pub fn navigate(&self, location: &str) -> GuardDecision {
        match AppRoute::parse(location) {
            Some(route) => evaluate(&self.session.snapshot(), &route),
            None => {
                debug!(location, "no route matches; redirecting home");
                GuardDecision::Redirect(AppRoute::Home)
            }
        }
    }

    /// Follow redirects from `location` to the page that renders.
    pub fn resolve(&self, location: &str) -> Navigation {
        let mut redirects = Vec::new();
        let mut route = match AppRoute::parse(location) {
            Some(route) => route,
            None => {
                redirects.push(AppRoute::Home);
                AppRoute::Home
            }
        };

        while redirects.len() <= MAX_REDIRECTS {
            match evaluate(&self.session.snapshot(), &route) {
                GuardDecision::Render => return Navigation { route, redirects },
                GuardDecision::Redirect(next) => {
                    debug!(from = %route, to = %next, "guard redirect");
                    redirects.push(next.clone());
                    route = next;
                }
            }
        }

        warn!(location, hops = redirects.len(), "redirect limit reached; showing login");
        Navigation {
            route: AppRoute::Login,
            redirects,
        }
    }
}

//! Session domain: identities, credentials, stages and guards.
//!
//! Purpose: model the phone → OTP → role flow and the access rules derived
//! from it, independent of transport and storage. Adapters live in
//! `outbound` and reach the domain only through the traits in [`ports`].
//!
//! Public surface:
//! - [`Session`] is the single authoritative view over the in-memory record
//!   and the durable cache.
//! - [`LoginStage`], [`OtpStage`] and [`RoleSelectionStage`] drive the flow.
//! - [`Router`] and the `evaluate_*` functions decide what each navigation
//!   shows.
//! - [`ProfileCompletionGate`] guards write actions on profile completeness.

pub mod auth;
pub mod countdown;
pub mod device;
pub mod error;
pub mod guard;
pub mod identity;
pub mod login_stage;
pub mod otp_stage;
pub mod ports;
pub mod profile_gate;
pub mod role;
pub mod role_selection_stage;
pub mod routes;
pub mod session;
pub mod session_cache;
pub mod session_store;

pub use self::auth::{
    CredentialValidationError, OTP_DIGITS, OtpCode, OtpEntry, PHONE_DIGITS, PhoneNumber,
    clean_phone_input,
};
pub use self::countdown::{RESEND_COOLDOWN_SECS, ResendCountdown};
pub use self::device::{DEFAULT_DEVICE_TYPE, DeviceId, DeviceProfile, FALLBACK_IP};
pub use self::error::{MISSING_USER_ID_MESSAGE, NETWORK_ERROR_MESSAGE, StageError};
pub use self::guard::{
    GuardDecision, MAX_REDIRECTS, Navigation, Router, evaluate, evaluate_auth_page_guard,
    evaluate_route_guard,
};
pub use self::identity::{
    Identity, IdentityFragment, IdentityValidationError, SessionToken, UserId,
};
pub use self::login_stage::{IP_LOOKUP_TIMEOUT, LoginStage};
pub use self::otp_stage::{OtpCodePolicy, OtpStage};
pub use self::profile_gate::{
    ProfileCompletionGate, PromptExit, PromptNavigation, PromptState, ProtectedAction,
    is_profile_complete,
};
pub use self::role::{PRODUCER_ROLES, PURCHASER_ROLES, Role, RoleParseError};
pub use self::role_selection_stage::RoleSelectionStage;
pub use self::routes::{AppRoute, AuthPage, NavigationState, RouteAccess, StageTransition};
pub use self::session::{
    AuthorizationPolicy, Session, SessionSnapshot, SessionSources, UnknownPolicyError,
};
pub use self::session_cache::SessionCache;
pub use self::session_store::{InFlight, Operation, SessionState, SessionStore};

//! Phone login stage.
//!
//! Collects a phone number, asks the server to start a login and hands the
//! pending identity to the session. The stage owns a cancellation token tied
//! to its lifetime: once torn down, late responses are dropped without
//! touching the session.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ports::{AuthApi, IpLookup, LoginRequest};
use super::{
    AppRoute, DeviceProfile, Operation, PhoneNumber, Session, StageError, StageTransition,
    clean_phone_input,
};

/// Time allowed for the public IP lookup before falling back.
pub const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Login screen state.
pub struct LoginStage {
    session: Session,
    api: Arc<dyn AuthApi>,
    ip_lookup: Arc<dyn IpLookup>,
    device: DeviceProfile,
    ip_timeout: Duration,
    phone_input: String,
    cancel: CancellationToken,
}

impl LoginStage {
    /// Mount the stage.
    pub fn new(
        session: Session,
        api: Arc<dyn AuthApi>,
        ip_lookup: Arc<dyn IpLookup>,
        device: DeviceProfile,
    ) -> Self {
        Self {
            session,
            api,
            ip_lookup,
            device,
            ip_timeout: IP_LOOKUP_TIMEOUT,
            phone_input: String::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the IP lookup timeout.
    #[must_use]
    pub fn with_ip_timeout(mut self, timeout: Duration) -> Self {
        self.ip_timeout = timeout;
        self
    }

    /// Replace the phone field with the cleaned form of `raw`.
    pub fn input_phone(&mut self, raw: &str) -> &str {
        self.phone_input = clean_phone_input(raw);
        &self.phone_input
    }

    /// Current phone field contents.
    pub fn phone_input(&self) -> &str {
        &self.phone_input
    }

    /// Stage error text.
    pub fn error(&self) -> Option<String> {
        self.session.store().error()
    }

    /// Whether a login request is in flight.
    pub fn is_loading(&self) -> bool {
        self.session.store().is_loading(Operation::Login)
    }

    /// Token cancelled when the stage is torn down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tear the stage down, abandoning any in-flight request.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    async fn resolve_ip(&self) -> IpAddr {
        match tokio::time::timeout(self.ip_timeout, self.ip_lookup.public_ip()).await {
            Ok(Ok(ip)) => ip,
            Ok(Err(error)) => {
                warn!(%error, "public ip lookup failed; using fallback");
                self.device.fallback_ip
            }
            Err(_) => {
                warn!(timeout = ?self.ip_timeout, "public ip lookup timed out; using fallback");
                self.device.fallback_ip
            }
        }
    }

    /// Submit the entered phone number.
    ///
    /// On success the pending identity is held in memory and the caller is
    /// sent to OTP verification carrying the phone. The phone field keeps
    /// its value on failure.
    ///
    /// # Errors
    /// - [`StageError::Validation`] when the number is not ten digits; no
    ///   request is sent.
    /// - [`StageError::Remote`] when the server refuses or cannot be reached.
    /// - [`StageError::Busy`] while another login is in flight.
    /// - [`StageError::Cancelled`] when the stage was torn down meanwhile.
    pub async fn submit(&self) -> Result<StageTransition, StageError> {
        self.session.store().clear_error();
        let phone = PhoneNumber::parse(&self.phone_input)
            .map_err(|error| self.session.report(error.into()))?;
        let _loading = self.session.store().begin(Operation::Login)?;

        let request = LoginRequest {
            phone: phone.clone(),
            device_id: self.session.cache().device_id(),
            ip: self.resolve_ip().await,
            device_type: self.device.device_type.clone(),
            latitude: self.device.latitude,
            longitude: self.device.longitude,
        };
        debug!(device_id = %request.device_id, ip = %request.ip, "login requested");

        let response = tokio::select! {
            () = self.cancel.cancelled() => return Err(StageError::Cancelled),
            response = self.api.login(&request) => response,
        };
        let fragment = response.map_err(|error| self.session.report(error.into()))?;

        match fragment.into_identity(Some(&phone)) {
            Ok(identity) => {
                info!(user_id = %identity.id(), "login accepted; awaiting otp");
                self.session.set_pending_identity(identity);
            }
            Err(error) => {
                warn!(%error, "login response carried no usable identity");
                self.session.forget_identity();
            }
        }
        Ok(StageTransition::with_phone(AppRoute::VerifyOtp, phone))
    }
}

impl Drop for LoginStage {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{
        AuthApiError, IpLookupError, MemoryDurableStore, MockAuthApi, MockIpLookup,
    };
    use crate::domain::{
        AuthorizationPolicy, CredentialValidationError, IdentityFragment, NETWORK_ERROR_MESSAGE,
        OtpCode, Role, UserId,
    };
    use async_trait::async_trait;
    use rstest::{fixture, rstest};
    use std::net::Ipv4Addr;

    const LOOKUP_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

    #[fixture]
    fn session() -> Session {
        Session::new(
            Arc::new(MemoryDurableStore::new()),
            AuthorizationPolicy::Reconciled,
        )
    }

    fn lookup_ok() -> MockIpLookup {
        let mut lookup = MockIpLookup::new();
        lookup.expect_public_ip().returning(|| Ok(LOOKUP_IP));
        lookup
    }

    fn stage(session: &Session, api: MockAuthApi, lookup: MockIpLookup) -> LoginStage {
        LoginStage::new(
            session.clone(),
            Arc::new(api),
            Arc::new(lookup),
            DeviceProfile::default(),
        )
    }

    #[rstest]
    #[case("12345")]
    #[case("")]
    #[case("phone")]
    #[tokio::test]
    async fn short_numbers_never_reach_the_server(session: Session, #[case] raw: &str) {
        let mut api = MockAuthApi::new();
        api.expect_login().never();
        let mut stage = stage(&session, api, MockIpLookup::new());
        stage.input_phone(raw);

        let error = stage.submit().await.expect_err("validation fails");
        assert_eq!(
            error,
            StageError::Validation(CredentialValidationError::InvalidPhone)
        );
        assert_eq!(
            stage.error().as_deref(),
            Some("enter a valid 10-digit mobile number")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn successful_login_carries_phone_to_otp(session: Session) {
        let mut api = MockAuthApi::new();
        api.expect_login()
            .withf(|request| {
                request.phone.as_str() == "9876543210"
                    && request.ip == LOOKUP_IP
                    && request.device_type == "web"
            })
            .times(1)
            .returning(|_| {
                Ok(IdentityFragment {
                    id: Some("u1".to_owned()),
                    ..IdentityFragment::default()
                })
            });
        let mut stage = stage(&session, api, lookup_ok());
        assert_eq!(stage.input_phone("+91 98765-43210"), "9198765432");
        stage.input_phone("98765 43210");

        let transition = stage.submit().await.expect("login succeeds");
        assert_eq!(transition.to, AppRoute::VerifyOtp);
        assert_eq!(
            transition.state.phone.as_ref().map(PhoneNumber::as_str),
            Some("9876543210")
        );
        let identity = session.identity().expect("pending identity");
        assert_eq!(identity.id().as_ref(), "u1");
        assert!(!stage.is_loading());
    }

    #[rstest]
    #[tokio::test]
    async fn device_id_is_reused_across_logins(session: Session) {
        let mut api = MockAuthApi::new();
        api.expect_login()
            .times(2)
            .returning(|_| Ok(IdentityFragment::default()));
        let mut stage = stage(&session, api, lookup_ok());
        stage.input_phone("9876543210");

        stage.submit().await.expect("first login");
        let first = session.cache().device_id();
        stage.submit().await.expect("second login");
        assert_eq!(session.cache().device_id(), first);
    }

    #[rstest]
    #[tokio::test]
    async fn ip_lookup_failure_uses_fallback(session: Session) {
        let mut lookup = MockIpLookup::new();
        lookup
            .expect_public_ip()
            .returning(|| Err(IpLookupError::unavailable("dns")));
        let mut api = MockAuthApi::new();
        api.expect_login()
            .withf(|request| request.ip == DeviceProfile::default().fallback_ip)
            .times(1)
            .returning(|_| Ok(IdentityFragment::default()));
        let mut stage = stage(&session, api, lookup);
        stage.input_phone("9876543210");

        stage.submit().await.expect("login still succeeds");
    }

    #[rstest]
    #[case(AuthApiError::rejected("user blocked"), "user blocked")]
    #[case(AuthApiError::transport("refused"), NETWORK_ERROR_MESSAGE)]
    #[tokio::test]
    async fn remote_failures_stay_on_login(
        session: Session,
        #[case] failure: AuthApiError,
        #[case] message: &str,
    ) {
        let mut api = MockAuthApi::new();
        api.expect_login()
            .times(1)
            .return_once(move |_| Err(failure));
        let mut stage = stage(&session, api, lookup_ok());
        stage.input_phone("9876543210");

        let error = stage.submit().await.expect_err("login fails");
        assert_eq!(error, StageError::remote(message));
        assert_eq!(stage.error().as_deref(), Some(message));
        assert_eq!(stage.phone_input(), "9876543210");
        assert!(session.identity().is_none());
    }

    struct HangingAuthApi;

    #[async_trait]
    impl AuthApi for HangingAuthApi {
        async fn login(
            &self,
            _request: &LoginRequest,
        ) -> Result<IdentityFragment, AuthApiError> {
            std::future::pending().await
        }

        async fn generate_otp(&self, _user_id: &UserId) -> Result<(), AuthApiError> {
            std::future::pending().await
        }

        async fn verify_otp(
            &self,
            _user_id: &UserId,
            _code: &OtpCode,
        ) -> Result<IdentityFragment, AuthApiError> {
            std::future::pending().await
        }

        async fn select_role(&self, _role: Role) -> Result<(), AuthApiError> {
            std::future::pending().await
        }

        async fn logout(&self) -> Result<(), AuthApiError> {
            std::future::pending().await
        }
    }

    #[rstest]
    #[tokio::test]
    async fn teardown_discards_late_results(session: Session) {
        let mut stage = LoginStage::new(
            session.clone(),
            Arc::new(HangingAuthApi),
            Arc::new(lookup_ok()),
            DeviceProfile::default(),
        );
        stage.input_phone("9876543210");
        let token = stage.cancellation_token();

        let (result, ()) = tokio::join!(stage.submit(), async move { token.cancel() });
        assert_eq!(result, Err(StageError::Cancelled));
        assert!(session.identity().is_none());
        assert!(session.store().error().is_none());
        assert!(!stage.is_loading());
    }
}

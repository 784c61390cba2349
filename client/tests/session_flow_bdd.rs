//! Behaviour tests for the phone → OTP → role flow and logout.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use client::domain::ports::{
    AuthApi, AuthApiError, DurableStore, FixtureIpLookup, MemoryDurableStore, StorageKey,
};
use client::domain::{
    AuthorizationPolicy, DeviceProfile, IdentityFragment, LoginStage, Navigation, OtpCodePolicy,
    OtpStage, Role, RoleSelectionStage, Router, Session, StageError, StageTransition, UserId,
};
use client::test_support::{AuthCall, ScriptedAuthApi};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::{Builder, Runtime};

const SEEDED_DEVICE_ID: &str = "device-1";

struct SessionFlowWorld {
    runtime: Runtime,
    store: Arc<MemoryDurableStore>,
    api: Arc<ScriptedAuthApi>,
    session: RefCell<Session>,
    otp: RefCell<Option<OtpStage>>,
    outcome: RefCell<Option<Result<StageTransition, StageError>>>,
    resend: RefCell<Option<Option<Result<(), StageError>>>>,
    navigation: RefCell<Option<Navigation>>,
}

impl SessionFlowWorld {
    fn new() -> Self {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .expect("create runtime");
        let store = Arc::new(MemoryDurableStore::new());
        let session = Session::new(durable(&store), AuthorizationPolicy::Reconciled);
        Self {
            runtime,
            store,
            api: Arc::new(ScriptedAuthApi::new()),
            session: RefCell::new(session),
            otp: RefCell::new(None),
            outcome: RefCell::new(None),
            resend: RefCell::new(None),
            navigation: RefCell::new(None),
        }
    }

    fn api(&self) -> Arc<dyn AuthApi> {
        self.api.clone()
    }

    fn stored(&self, key: StorageKey) -> Option<String> {
        self.store.get(key).expect("memory store read")
    }

    fn transition(&self) -> StageTransition {
        self.outcome
            .borrow()
            .clone()
            .expect("a stage should have been submitted")
            .expect("the stage should have succeeded")
    }

    fn with_otp<T>(&self, f: impl FnOnce(&mut OtpStage) -> T) -> T {
        let mut otp = self.otp.borrow_mut();
        f(otp.as_mut().expect("otp stage should be mounted"))
    }
}

fn durable(store: &Arc<MemoryDurableStore>) -> Arc<dyn DurableStore> {
    store.clone()
}

fn fragment(user_id: &str, role: Option<&str>) -> IdentityFragment {
    IdentityFragment {
        id: Some(user_id.to_owned()),
        token: Some(format!("token-{user_id}")),
        user_type: role.map(str::to_owned),
        ..IdentityFragment::default()
    }
}

#[fixture]
fn world() -> SessionFlowWorld {
    SessionFlowWorld::new()
}

#[given("a fresh session")]
fn a_fresh_session(world: &SessionFlowWorld) {
    assert_eq!(world.api.call_count(), 0);
    assert!(!world.session.borrow().snapshot().authorized);
}

#[given("the server accepts login for user {user_id}")]
fn the_server_accepts_login(world: &SessionFlowWorld, user_id: String) {
    world.api.push_login(Ok(IdentityFragment {
        id: Some(user_id),
        ..IdentityFragment::default()
    }));
}

#[given("the server verifies the code with role {role}")]
fn the_server_verifies_with_role(world: &SessionFlowWorld, role: String) {
    world.api.push_verify(Ok(fragment("u-1", Some(&role))));
}

#[given("the server verifies the code without a role")]
fn the_server_verifies_without_role(world: &SessionFlowWorld) {
    world.api.push_verify(Ok(fragment("u-1", None)));
}

#[given("the server verifies the code without a token for role {role}")]
fn the_server_verifies_without_token(world: &SessionFlowWorld, role: String) {
    world.api.push_verify(Ok(IdentityFragment {
        token: None,
        ..fragment("u-1", Some(&role))
    }));
}

#[given("the server verifies the code without a role or token")]
fn the_server_verifies_without_role_or_token(world: &SessionFlowWorld) {
    world.api.push_verify(Ok(IdentityFragment {
        token: None,
        ..fragment("u-1", None)
    }));
}

#[given("the server fails logout")]
fn the_server_fails_logout(world: &SessionFlowWorld) {
    world
        .api
        .push_logout(Err(AuthApiError::transport("connection reset")));
}

#[given("a session stored for user {user_id} with role {role}")]
fn a_stored_session(world: &SessionFlowWorld, user_id: String, role: String) {
    let stored = IdentityFragment {
        mobile: Some("9876543210".to_owned()),
        ..fragment(&user_id, Some(&role))
    };
    let blob = serde_json::to_string(&stored).expect("serialise blob");
    for (key, value) in [
        (StorageKey::Identity, blob.as_str()),
        (StorageKey::Token, "token-stored"),
        (StorageKey::SelectedRole, role.as_str()),
        (StorageKey::DeviceId, SEEDED_DEVICE_ID),
    ] {
        world.store.set(key, value).expect("seed store");
    }
    *world.session.borrow_mut() =
        Session::hydrate(durable(&world.store), AuthorizationPolicy::Reconciled);
    let session = world.session.borrow();
    assert!(session.identity().is_some());
    assert!(session.snapshot().authorized);
}

#[when("the user logs in with {phone}")]
fn the_user_logs_in(world: &SessionFlowWorld, phone: String) {
    let session = world.session.borrow().clone();
    let mut stage = LoginStage::new(
        session.clone(),
        world.api(),
        Arc::new(FixtureIpLookup::new(DeviceProfile::default().fallback_ip)),
        DeviceProfile::default(),
    );
    stage.input_phone(&phone);
    let result = world.runtime.block_on(stage.submit());

    if let Ok(transition) = &result {
        let _entered = world.runtime.enter();
        let mut otp = OtpStage::mount(
            session,
            world.api(),
            transition.state.clone(),
            OtpCodePolicy::Entered,
        )
        .expect("otp stage should mount with a carried phone");
        otp.start_countdown();
        *world.otp.borrow_mut() = Some(otp);
    }
    *world.outcome.borrow_mut() = Some(result);
}

#[when("the user enters the code {code}")]
fn the_user_enters_the_code(world: &SessionFlowWorld, code: String) {
    world.with_otp(|otp| otp.paste(&code));
    let otp = world.otp.borrow();
    let stage = otp.as_ref().expect("otp stage should be mounted");
    let result = world.runtime.block_on(stage.submit());
    *world.outcome.borrow_mut() = Some(result);
}

#[when("the user picks the role {role}")]
fn the_user_picks_the_role(world: &SessionFlowWorld, role: String) {
    let mut stage = RoleSelectionStage::new(world.session.borrow().clone(), world.api());
    stage.select(Role::parse_tag(&role).expect("known role"));
    let result = world
        .runtime
        .block_on(stage.submit())
        .expect("a role is selected");
    *world.outcome.borrow_mut() = Some(result);
}

#[when("the user asks for a new code")]
fn the_user_asks_for_a_new_code(world: &SessionFlowWorld) {
    let otp = world.otp.borrow();
    let stage = otp.as_ref().expect("otp stage should be mounted");
    let result = world.runtime.block_on(stage.resend());
    *world.resend.borrow_mut() = Some(result);
}

#[when("{seconds} seconds pass")]
fn seconds_pass(world: &SessionFlowWorld, seconds: u64) {
    world.runtime.block_on(async move {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    });
}

#[when("the user opens {location}")]
fn the_user_opens(world: &SessionFlowWorld, location: String) {
    let router = Router::new(world.session.borrow().clone());
    *world.navigation.borrow_mut() = Some(router.resolve(&location));
}

#[when("the user logs out")]
fn the_user_logs_out(world: &SessionFlowWorld) {
    let session = world.session.borrow().clone();
    let result = world.runtime.block_on(session.logout(world.api.as_ref()));
    *world.outcome.borrow_mut() = Some(result);
}

#[then("the page shown is {path}")]
fn the_page_shown_is(world: &SessionFlowWorld, path: String) {
    let navigation = world
        .navigation
        .borrow()
        .clone()
        .expect("a location should have been opened");
    assert_eq!(navigation.route.path(), path);
}

#[then("no durable token is stored")]
fn no_durable_token_is_stored(world: &SessionFlowWorld) {
    assert_eq!(world.stored(StorageKey::Token), None);
}

#[then("the server received a login for {phone}")]
fn the_server_received_a_login(world: &SessionFlowWorld, phone: String) {
    let calls = world.api.calls();
    let Some(AuthCall::Login(request)) = calls.first() else {
        panic!("expected a login call, got {calls:?}");
    };
    assert_eq!(request.phone.as_str(), phone);
    assert_eq!(
        Some(request.device_id.to_string()),
        world.stored(StorageKey::DeviceId)
    );
}

#[then("the next page is {path}")]
fn the_next_page_is(world: &SessionFlowWorld, path: String) {
    assert_eq!(world.transition().to.path(), path);
}

#[then("no error is shown")]
fn no_error_is_shown(world: &SessionFlowWorld) {
    assert_eq!(world.session.borrow().store().error(), None);
}

#[then("no request was sent")]
fn no_request_was_sent(world: &SessionFlowWorld) {
    assert_eq!(world.api.call_count(), 0);
}

#[then("a validation error is shown")]
fn a_validation_error_is_shown(world: &SessionFlowWorld) {
    let outcome = world.outcome.borrow();
    assert!(matches!(
        outcome.as_ref(),
        Some(Err(StageError::Validation(_)))
    ));
    assert!(world.session.borrow().store().error().is_some());
}

#[then("the durable role is {role}")]
fn the_durable_role_is(world: &SessionFlowWorld, role: String) {
    assert_eq!(world.stored(StorageKey::SelectedRole), Some(role));
}

#[then("no durable role is stored")]
fn no_durable_role_is_stored(world: &SessionFlowWorld) {
    assert_eq!(world.stored(StorageKey::SelectedRole), None);
}

#[then("the session is authorized")]
fn the_session_is_authorized(world: &SessionFlowWorld) {
    assert!(world.session.borrow().snapshot().authorized);
}

#[then("the session is not authorized")]
fn the_session_is_not_authorized(world: &SessionFlowWorld) {
    let session = world.session.borrow();
    assert!(!session.snapshot().authorized);
    assert_eq!(session.identity(), None);
    for key in [
        StorageKey::Identity,
        StorageKey::Token,
        StorageKey::SelectedRole,
    ] {
        assert_eq!(world.stored(key), None, "{} should be cleared", key.as_str());
    }
}

#[then("the server received the role {role}")]
fn the_server_received_the_role(world: &SessionFlowWorld, role: String) {
    let expected = AuthCall::SelectRole(Role::parse_tag(&role).expect("known role"));
    assert!(world.api.calls().contains(&expected));
}

#[then("no new code was requested")]
fn no_new_code_was_requested(world: &SessionFlowWorld) {
    assert!(matches!(*world.resend.borrow(), Some(None)));
    assert!(
        !world
            .api
            .calls()
            .iter()
            .any(|call| matches!(call, AuthCall::GenerateOtp(_)))
    );
}

#[then("a new code was requested for user {user_id}")]
fn a_new_code_was_requested(world: &SessionFlowWorld, user_id: String) {
    assert!(matches!(*world.resend.borrow(), Some(Some(Ok(())))));
    let expected = AuthCall::GenerateOtp(UserId::new(&user_id).expect("user id"));
    assert!(world.api.calls().contains(&expected));
}

#[then("the countdown shows {seconds} seconds")]
fn the_countdown_shows(world: &SessionFlowWorld, seconds: u32) {
    assert_eq!(world.with_otp(|otp| otp.countdown().remaining()), seconds);
}

#[then("the device id is kept")]
fn the_device_id_is_kept(world: &SessionFlowWorld) {
    assert_eq!(
        world.stored(StorageKey::DeviceId).as_deref(),
        Some(SEEDED_DEVICE_ID)
    );
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "Login sends the number and moves to verification"
)]
fn login_sends_the_number(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "A short mobile number is rejected locally"
)]
fn short_numbers_are_rejected(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "Verifying an account that already has a role"
)]
fn verifying_an_account_with_a_role(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "Verifying a new account asks for a role"
)]
fn verifying_a_new_account(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "Choosing a role completes the session"
)]
fn choosing_a_role(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "Resending waits for the countdown"
)]
fn resending_waits_for_the_countdown(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "Logout clears the session but keeps the device"
)]
fn logout_keeps_the_device(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "A verified account without a token reaches its pages"
)]
fn tokenless_verification_reaches_pages(world: SessionFlowWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_flow.feature",
    name = "A new account without a token can choose a role"
)]
fn tokenless_new_accounts_choose_a_role(world: SessionFlowWorld) {
    drop(world);
}

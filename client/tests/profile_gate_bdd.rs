//! Behaviour tests for the profile completion gate.

use std::cell::RefCell;

use client::domain::{
    AppRoute, Identity, PhoneNumber, ProfileCompletionGate, PromptExit, PromptNavigation,
    PromptState, ProtectedAction, UserId,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::{Builder, Runtime};

struct ProfileGateWorld {
    runtime: Runtime,
    gate: RefCell<ProfileCompletionGate>,
    identity: RefCell<Option<Identity>>,
    outcome: RefCell<Option<Option<AppRoute>>>,
}

impl ProfileGateWorld {
    fn new() -> Self {
        Self {
            runtime: Builder::new_current_thread()
                .build()
                .expect("create runtime"),
            gate: RefCell::new(ProfileCompletionGate::new()),
            identity: RefCell::new(None),
            outcome: RefCell::new(None),
        }
    }

    fn sign_in(&self, identity: Identity) {
        *self.identity.borrow_mut() = Some(identity);
    }

    fn observe(&self) {
        let identity = self.identity.borrow().clone();
        let mut gate = self.gate.borrow_mut();
        self.runtime
            .block_on(gate.observe_deferred(identity.as_ref()));
    }

    fn attempt(&self, action: ProtectedAction) {
        let identity = self.identity.borrow().clone();
        let outcome = self.gate.borrow_mut().require(action, identity.as_ref());
        *self.outcome.borrow_mut() = Some(outcome);
    }
}

fn identity(user_id: &str) -> Identity {
    Identity::new(
        UserId::new(user_id).expect("user id"),
        PhoneNumber::parse("9876543210").expect("phone"),
    )
}

fn prompt_state(raw: &str) -> PromptState {
    match raw {
        "closed" => PromptState::Closed,
        "scheduled" => PromptState::Scheduled,
        "open" => PromptState::Open,
        "dismissed" => PromptState::Dismissed,
        other => panic!("unknown prompt state '{other}'"),
    }
}

#[fixture]
fn world() -> ProfileGateWorld {
    ProfileGateWorld::new()
}

#[given("a signed-in user {user_id} without a name")]
fn a_user_without_a_name(world: &ProfileGateWorld, user_id: String) {
    world.sign_in(identity(&user_id));
}

#[given("a signed-in user {user_id} named {first} {last}")]
fn a_named_user(world: &ProfileGateWorld, user_id: String, first: String, last: String) {
    world.sign_in(identity(&user_id).with_names(first, last));
}

#[when("the identity is observed")]
fn the_identity_is_observed(world: &ProfileGateWorld) {
    world.observe();
}

#[when("the identity is observed again")]
fn the_identity_is_observed_again(world: &ProfileGateWorld) {
    world.observe();
}

#[when("the user dismisses the prompt")]
fn the_user_dismisses_the_prompt(world: &ProfileGateWorld) {
    let navigation = world.gate.borrow_mut().choose(PromptExit::Dismiss);
    assert_eq!(navigation, PromptNavigation::Back);
}

#[when("the user {user_id} signs in without a name")]
fn another_user_signs_in(world: &ProfileGateWorld, user_id: String) {
    world.sign_in(identity(&user_id));
}

#[when("the user tries to sell a crop")]
fn the_user_tries_to_sell(world: &ProfileGateWorld) {
    world.attempt(ProtectedAction::SellCrop);
}

#[when("the user tries to post a requirement")]
fn the_user_tries_to_post(world: &ProfileGateWorld) {
    world.attempt(ProtectedAction::PostRequirement);
}

#[then("the completion prompt is {state}")]
fn the_completion_prompt_is(world: &ProfileGateWorld, state: String) {
    assert_eq!(world.gate.borrow().prompt(), prompt_state(&state));
}

#[then("the action is refused")]
fn the_action_is_refused(world: &ProfileGateWorld) {
    assert_eq!(*world.outcome.borrow(), Some(None));
}

#[then("the action leads to {path}")]
fn the_action_leads_to(world: &ProfileGateWorld, path: String) {
    let outcome = world.outcome.borrow().clone().flatten();
    assert_eq!(outcome.map(|route| route.path().into_owned()), Some(path));
}

#[scenario(
    path = "tests/features/profile_gate.feature",
    name = "An incomplete profile opens the prompt once"
)]
fn incomplete_profiles_open_the_prompt(world: ProfileGateWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/profile_gate.feature",
    name = "A dismissed prompt is not reopened by actions"
)]
fn dismissed_prompts_stay_closed(world: ProfileGateWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/profile_gate.feature",
    name = "A complete profile proceeds to the action"
)]
fn complete_profiles_proceed(world: ProfileGateWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/profile_gate.feature",
    name = "A different identity brings the prompt back"
)]
fn new_identities_bring_the_prompt_back(world: ProfileGateWorld) {
    drop(world);
}

//! Profile completion gate.
//!
//! Write actions such as posting a requirement or selling a crop need a
//! first and last name. The gate answers that question and drives the
//! completion prompt, including the automatic prompt that opens one tick
//! after an incomplete identity first appears.

use tracing::debug;

use super::{AppRoute, Identity, UserId};

/// Completion prompt lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptState {
    /// Not shown.
    #[default]
    Closed,
    /// Will open on the next tick.
    Scheduled,
    /// Shown.
    Open,
    /// Closed by the user; explicit checks no longer reopen it.
    Dismissed,
}

/// Actions that require a complete profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedAction {
    /// Post a purchase requirement.
    PostRequirement,
    /// List a crop for sale.
    SellCrop,
}

impl ProtectedAction {
    /// Page the action leads to.
    pub fn route(self) -> AppRoute {
        match self {
            Self::PostRequirement => AppRoute::PostRequirement,
            Self::SellCrop => AppRoute::Sell,
        }
    }
}

/// Ways out of the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptExit {
    /// Go and fill in the profile.
    EditProfile,
    /// Close the prompt.
    Dismiss,
}

/// Navigation produced by a prompt exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptNavigation {
    /// Go to a route.
    To(AppRoute),
    /// Go one step back in history.
    Back,
}

/// Whether `identity` has both names.
pub fn is_profile_complete(identity: Option<&Identity>) -> bool {
    identity.is_some_and(Identity::is_profile_complete)
}

/// Gate state for one UI session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileCompletionGate {
    prompt: PromptState,
    detected: Option<UserId>,
}

impl ProfileCompletionGate {
    /// Gate with the prompt closed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompt state.
    pub fn prompt(&self) -> PromptState {
        self.prompt
    }

    /// Whether the prompt is showing.
    pub fn is_open(&self) -> bool {
        self.prompt == PromptState::Open
    }

    /// React to an identity change.
    ///
    /// The first time a given identity is seen incomplete the prompt is
    /// scheduled, even if it was dismissed before.
    pub fn observe(&mut self, identity: Option<&Identity>) {
        let Some(identity) = identity else {
            self.detected = None;
            return;
        };
        if self.detected.as_ref() == Some(identity.id()) {
            return;
        }
        self.detected = Some(identity.id().clone());
        if !identity.is_profile_complete() && self.prompt != PromptState::Open {
            debug!(user_id = %identity.id(), "incomplete profile detected; scheduling prompt");
            self.prompt = PromptState::Scheduled;
        }
    }

    /// Advance one scheduling tick.
    pub fn tick(&mut self) {
        if self.prompt == PromptState::Scheduled {
            self.prompt = PromptState::Open;
        }
    }

    /// Observe, then let one tick pass before opening.
    pub async fn observe_deferred(&mut self, identity: Option<&Identity>) {
        self.observe(identity);
        if self.prompt == PromptState::Scheduled {
            tokio::task::yield_now().await;
            self.tick();
        }
    }

    /// Callable guard: `true` when complete, otherwise `false` and the
    /// prompt opens unless the user already dismissed it.
    pub fn check(&mut self, identity: Option<&Identity>) -> bool {
        if is_profile_complete(identity) {
            return true;
        }
        if matches!(self.prompt, PromptState::Closed | PromptState::Scheduled) {
            self.prompt = PromptState::Open;
        }
        false
    }

    /// Route for `action` when the profile allows it.
    pub fn require(
        &mut self,
        action: ProtectedAction,
        identity: Option<&Identity>,
    ) -> Option<AppRoute> {
        self.check(identity).then(|| action.route())
    }

    /// Close the prompt through `exit`.
    pub fn choose(&mut self, exit: PromptExit) -> PromptNavigation {
        match exit {
            PromptExit::EditProfile => {
                self.prompt = PromptState::Closed;
                PromptNavigation::To(AppRoute::EditProfile)
            }
            PromptExit::Dismiss => {
                self.prompt = PromptState::Dismissed;
                PromptNavigation::Back
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{PhoneNumber, UserId};
    use rstest::rstest;

    fn identity(id: &str) -> Identity {
        Identity::new(
            UserId::new(id).expect("id"),
            PhoneNumber::parse("9876543210").expect("phone"),
        )
    }

    #[rstest]
    #[case("Asha", "Rao", true)]
    #[case("  ", "Rao", false)]
    #[case("Asha", "", false)]
    fn completeness_needs_both_names(#[case] first: &str, #[case] last: &str, #[case] complete: bool) {
        let identity = identity("u1").with_names(first, last);
        assert_eq!(is_profile_complete(Some(&identity)), complete);
    }

    #[test]
    fn complete_profile_has_no_side_effect() {
        let mut gate = ProfileCompletionGate::new();
        let identity = identity("u1").with_names("Asha", "Rao");
        assert!(gate.check(Some(&identity)));
        assert!(gate.check(Some(&identity)));
        assert_eq!(gate.prompt(), PromptState::Closed);
        assert_eq!(
            gate.require(ProtectedAction::SellCrop, Some(&identity)),
            Some(AppRoute::Sell)
        );
    }

    #[test]
    fn dismissed_prompt_stays_closed_on_repeat_checks() {
        let mut gate = ProfileCompletionGate::new();
        let identity = identity("u1");
        assert!(!gate.check(Some(&identity)));
        assert!(gate.is_open());
        assert_eq!(gate.choose(PromptExit::Dismiss), PromptNavigation::Back);

        assert!(!gate.check(Some(&identity)));
        assert!(!gate.check(Some(&identity)));
        assert_eq!(gate.prompt(), PromptState::Dismissed);
        assert_eq!(
            gate.require(ProtectedAction::PostRequirement, Some(&identity)),
            None
        );
    }

    #[test]
    fn first_detection_schedules_then_opens_on_tick() {
        let mut gate = ProfileCompletionGate::new();
        let identity = identity("u1");

        gate.observe(Some(&identity));
        assert_eq!(gate.prompt(), PromptState::Scheduled);
        gate.tick();
        assert!(gate.is_open());

        assert_eq!(
            gate.choose(PromptExit::EditProfile),
            PromptNavigation::To(AppRoute::EditProfile)
        );
        gate.observe(Some(&identity));
        assert_eq!(gate.prompt(), PromptState::Closed);
    }

    #[test]
    fn new_identity_reopens_dismissed_prompt() {
        let mut gate = ProfileCompletionGate::new();
        gate.observe(Some(&identity("u1")));
        gate.tick();
        gate.choose(PromptExit::Dismiss);

        gate.observe(None);
        gate.observe(Some(&identity("u1")));
        assert_eq!(gate.prompt(), PromptState::Scheduled);
    }

    #[tokio::test]
    async fn deferred_observation_opens_after_yield() {
        let mut gate = ProfileCompletionGate::new();
        gate.observe_deferred(Some(&identity("u2"))).await;
        assert!(gate.is_open());
    }
}

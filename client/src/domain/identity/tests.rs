//! Tests for the identity record and its wire fragment.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn phone() -> PhoneNumber {
    PhoneNumber::parse("9876543210").expect("fixture phone")
}

#[rstest]
fn decodes_server_fragment(phone: PhoneNumber) {
    let fragment: IdentityFragment = serde_json::from_value(json!({
        "_id": "u1",
        "mobile": "9876543210",
        "firstName": "Asha",
        "lastName": "Patil",
        "userType": "farmer",
        "token": "tok-1",
        "unrelated": true,
    }))
    .expect("fragment decodes");

    let identity = fragment.into_identity(None).expect("valid identity");
    assert_eq!(identity.id().as_ref(), "u1");
    assert_eq!(identity.mobile(), &phone);
    assert_eq!(identity.role(), Some(Role::Farmer));
    assert_eq!(identity.token().map(SessionToken::expose), Some("tok-1"));
    assert!(identity.is_profile_complete());
}

#[rstest]
fn fallback_phone_fills_missing_mobile(phone: PhoneNumber) {
    let fragment = IdentityFragment {
        id: Some("u1".to_owned()),
        ..IdentityFragment::default()
    };
    let identity = fragment
        .into_identity(Some(&phone))
        .expect("fallback phone applies");
    assert_eq!(identity.mobile(), &phone);
    assert_eq!(identity.role(), None);
}

#[rstest]
#[case(IdentityFragment::default(), IdentityValidationError::EmptyId)]
#[case(
    IdentityFragment { id: Some("   ".to_owned()), ..IdentityFragment::default() },
    IdentityValidationError::EmptyId
)]
#[case(
    IdentityFragment { id: Some("u1".to_owned()), ..IdentityFragment::default() },
    IdentityValidationError::MissingPhone
)]
#[case(
    IdentityFragment {
        id: Some("u1".to_owned()),
        mobile: Some("12".to_owned()),
        ..IdentityFragment::default()
    },
    IdentityValidationError::InvalidPhone(CredentialValidationError::InvalidPhone)
)]
fn rejects_incomplete_fragments(
    #[case] fragment: IdentityFragment,
    #[case] expected: IdentityValidationError,
) {
    assert_eq!(fragment.into_identity(None), Err(expected));
}

#[test]
fn unknown_role_is_rejected() {
    let fragment = IdentityFragment {
        id: Some("u1".to_owned()),
        mobile: Some("9876543210".to_owned()),
        user_type: Some("ADMIN".to_owned()),
        ..IdentityFragment::default()
    };
    assert!(matches!(
        fragment.into_identity(None),
        Err(IdentityValidationError::InvalidRole(_))
    ));
}

#[rstest]
#[case(Some("Asha"), Some("Patil"), true)]
#[case(Some("Asha"), None, false)]
#[case(None, Some("Patil"), false)]
#[case(Some("  "), Some("Patil"), false)]
#[case(None, None, false)]
fn profile_completeness_requires_both_names(
    phone: PhoneNumber,
    #[case] first: Option<&str>,
    #[case] last: Option<&str>,
    #[case] complete: bool,
) {
    let fragment = IdentityFragment {
        id: Some("u1".to_owned()),
        first_name: first.map(str::to_owned),
        last_name: last.map(str::to_owned),
        ..IdentityFragment::default()
    };
    let identity = fragment.into_identity(Some(&phone)).expect("valid identity");
    assert_eq!(identity.is_profile_complete(), complete);
}

#[rstest]
fn durable_blob_round_trips_role_and_token(phone: PhoneNumber) {
    let identity = Identity::new(UserId::new("u1").expect("id"), phone)
        .with_role(Role::Buyer)
        .with_token(SessionToken::new("tok").expect("token"));

    let blob = serde_json::to_string(&identity).expect("serialise identity");
    assert!(blob.contains("\"_id\":\"u1\""));
    assert!(blob.contains("\"userType\":\"BUYER\""));

    let restored: Identity = serde_json::from_str(&blob).expect("deserialise identity");
    assert_eq!(restored, identity);
}

#[test]
fn token_debug_output_is_redacted() {
    let token = SessionToken::new("secret-value").expect("token");
    assert_eq!(format!("{token:?}"), "SessionToken(***)");
    assert!(SessionToken::new("  ").is_none());
}

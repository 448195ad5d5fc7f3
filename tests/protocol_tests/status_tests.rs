//! Status and Action Tests
//!
//! Tests for the status table and action code lookups.

use std::collections::HashSet;

use rdd::protocol::{ActionCode, StatusCode};
use rdd::RddError;

// =============================================================================
// Status Lookup Tests
// =============================================================================

#[test]
fn test_lookup_success() {
    let status = StatusCode::lookup("ESUCCESS").unwrap();
    assert_eq!(status.value, 0);
    assert_eq!(status.message, "Success");
    assert!(status.is_success());
}

#[test]
fn test_lookup_aliases_share_value() {
    assert_eq!(StatusCode::lookup("EAGAIN").unwrap().value, -11);
    assert_eq!(StatusCode::lookup("EWOULDBLOCK").unwrap().value, -11);
    assert_eq!(StatusCode::lookup("EDEADLK").unwrap().value, -35);
    assert_eq!(StatusCode::lookup("EDEADLOCK").unwrap().value, -35);
}

#[test]
fn test_lookup_device_driver_additions() {
    assert_eq!(StatusCode::lookup("EPANIC").unwrap().value, -151);
    assert_eq!(StatusCode::lookup("ENOTSUP").unwrap().value, -150);
}

#[test]
fn test_lookup_unknown_name() {
    match StatusCode::lookup("EBOGUS") {
        Err(RddError::UnknownStatus(name)) => assert_eq!(name, "EBOGUS"),
        other => panic!("Expected UnknownStatus, got {:?}", other),
    }
}

#[test]
fn test_lookup_is_case_sensitive() {
    assert!(StatusCode::lookup("eperm").is_err());
}

#[test]
fn test_associated_constants_match_table() {
    assert_eq!(StatusCode::ETIMEDOUT.value, -110);
    assert_eq!(StatusCode::lookup("ETIMEDOUT").unwrap(), StatusCode::ETIMEDOUT);
    assert_eq!(StatusCode::ENOTRECOVERABLE.value, -131);
}

// =============================================================================
// Reverse Lookup Tests
// =============================================================================

#[test]
fn test_from_value_prefers_first_alias() {
    assert_eq!(StatusCode::from_value(-11).unwrap().name, "EAGAIN");
    assert_eq!(StatusCode::from_value(-35).unwrap().name, "EDEADLK");
}

#[test]
fn test_from_value_gaps() {
    // errno 41 and 58 are unassigned
    assert!(StatusCode::from_value(-41).is_none());
    assert!(StatusCode::from_value(-58).is_none());
    assert!(StatusCode::from_value(1).is_none());
}

// =============================================================================
// Table Shape Tests
// =============================================================================

#[test]
fn test_table_shape() {
    let all = StatusCode::all();
    assert_eq!(all.len(), 134);
    assert_eq!(all[0], StatusCode::ESUCCESS);

    let names: HashSet<&str> = all.iter().map(|s| s.name).collect();
    assert_eq!(names.len(), all.len());

    let values: HashSet<i16> = all.iter().map(|s| s.value).collect();
    assert_eq!(values.len(), all.len() - 2);

    assert!(all.iter().all(|s| s.value <= 0));
}

#[test]
fn test_display() {
    assert_eq!(
        StatusCode::EPERM.to_string(),
        "EPERM (-1): Operation not permitted"
    );
}

// =============================================================================
// Action Code Tests
// =============================================================================

#[test]
fn test_action_lookup() {
    assert_eq!(ActionCode::lookup("OPEN").unwrap(), 0);
    assert_eq!(ActionCode::lookup("READ").unwrap(), 1);
    assert_eq!(ActionCode::lookup("WRITE").unwrap(), 2);
    assert_eq!(ActionCode::lookup("CLOSE").unwrap(), 3);
}

#[test]
fn test_action_lookup_unknown() {
    assert!(matches!(
        ActionCode::lookup("SEEK"),
        Err(RddError::UnknownAction(_))
    ));
}

#[test]
fn test_action_try_from_byte() {
    for action in ActionCode::ALL {
        assert_eq!(ActionCode::try_from(action as u8).unwrap(), action);
    }
    assert!(ActionCode::try_from(4).is_err());
}

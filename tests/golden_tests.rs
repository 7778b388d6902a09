//! Golden tests - fixture-based tests that lock expected behavior
//!
//! The public bucket policy is a security-relevant document. Any change in
//! its serialized form will cause these tests to fail.
//!
//! Run with: cargo test --test golden_tests

use std::fs;

use bucketsync::bucket::public_access_policy;
use serde_json::Value;

// ============================================================================
// PUBLIC POLICY GOLDEN TESTS
// ============================================================================

#[test]
fn test_public_policy_golden() {
    let fixture_path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/public_policy.json"
    );
    let content = fs::read_to_string(fixture_path).expect("Failed to read public_policy.json fixture");
    let expected: Value = serde_json::from_str(&content).expect("Failed to parse fixture JSON");

    let actual = serde_json::to_value(public_access_policy("daily-docs")).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn test_public_policy_key_order() {
    let json = serde_json::to_string(&public_access_policy("b")).unwrap();
    assert_eq!(
        json,
        r#"{"Version":"2012-10-17","Statement":[{"Sid":"PublicReadWriteDelete","Effect":"Allow","Principal":"*","Action":["s3:GetObject","s3:PutObject","s3:DeleteObject"],"Resource":"arn:aws:s3:::b/*"}]}"#
    );
}

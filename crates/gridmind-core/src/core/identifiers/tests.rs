#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;

#[test]
fn string_identifiers_round_trip_serde() {
    let tenant = TenantId::from("tenant-a");
    let json = serde_json::to_string(&tenant).expect("serialize");
    assert_eq!(json, "\"tenant-a\"");
    let back: TenantId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, tenant);
}

#[test]
fn job_id_parse_rejects_garbage() {
    assert!(JobId::parse("not-a-uuid").is_err());
}

#[test]
fn job_id_generate_is_unique() {
    let first = JobId::generate();
    let second = JobId::generate();
    assert_ne!(first, second);
}

#[test]
fn job_id_display_round_trips() {
    let id = JobId::generate();
    let parsed = JobId::parse(&id.to_string()).expect("parse");
    assert_eq!(parsed, id);
}

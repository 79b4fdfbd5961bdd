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
fn envelope_round_trips_binary_form() {
    let envelope = ModelEnvelope {
        kind: ModelKind::Forecast,
        format_version: 1,
        payload: vec![1, 2, 3, 4, 5],
    };
    let bytes = envelope.to_bytes();
    let back = ModelEnvelope::from_bytes(&bytes).expect("decode");
    assert_eq!(back, envelope);
}

#[test]
fn envelope_rejects_truncated_input() {
    let envelope = ModelEnvelope {
        kind: ModelKind::Anomaly,
        format_version: 1,
        payload: vec![0; 32],
    };
    let mut bytes = envelope.to_bytes();
    bytes.truncate(bytes.len() - 1);
    assert!(ModelEnvelope::from_bytes(&bytes).is_err());
}

#[test]
fn envelope_rejects_unknown_magic() {
    assert!(ModelEnvelope::from_bytes(b"XXXX\x01\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00").is_err());
}

#[test]
fn cancel_flag_latches() {
    let flag = CancelFlag::new();
    assert!(!flag.is_cancelled());
    let shared = flag.clone();
    shared.cancel();
    assert!(flag.is_cancelled());
}

#[test]
fn store_errors_map_to_platform_kinds() {
    let conflict: PlatformError = StoreError::Conflict("duplicate".to_string()).into();
    assert_eq!(conflict.kind(), crate::core::ErrorKind::Conflict);
    let missing: PlatformError = ObjectStoreError::NotFound("key".to_string()).into();
    assert_eq!(missing.kind(), crate::core::ErrorKind::NotFound);
    let backend: PlatformError = ObjectStoreError::Backend("boom".to_string()).into();
    assert_eq!(backend.kind(), crate::core::ErrorKind::Unavailable);
}

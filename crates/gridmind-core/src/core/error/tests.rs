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
fn kinds_map_to_stable_labels() {
    assert_eq!(ErrorKind::Validation.as_str(), "validation");
    assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
    assert_eq!(ErrorKind::Precondition.as_str(), "precondition");
    assert_eq!(ErrorKind::Timeout.as_str(), "timeout");
}

#[test]
fn platform_error_reports_kind_and_message() {
    let error = PlatformError::Precondition("cannot delete production model".to_string());
    assert_eq!(error.kind(), ErrorKind::Precondition);
    assert_eq!(error.message(), "cannot delete production model");
    assert_eq!(error.to_string(), "precondition failed: cannot delete production model");
}

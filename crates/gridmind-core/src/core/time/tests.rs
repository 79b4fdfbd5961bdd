#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;

/// 2025-01-01T00:00:00Z.
const JAN_FIRST_2025: i64 = 1_735_689_600_000;

#[test]
fn hour_bucket_floors_to_hour() {
    let ts = Timestamp::from_unix_millis(JAN_FIRST_2025 + 59 * 60_000 + 1_234);
    assert_eq!(ts.hour_bucket().unix_millis(), JAN_FIRST_2025);
}

#[test]
fn calendar_decomposes_known_date() {
    // 2025-01-01 is a Wednesday.
    let parts = Timestamp::from_unix_millis(JAN_FIRST_2025).calendar();
    assert_eq!(parts.hour_of_day, 0);
    assert_eq!(parts.day_of_week, 2);
    assert_eq!(parts.day_of_month, 1);
    assert_eq!(parts.month, 1);
    assert_eq!(parts.quarter, 1);
    assert!(!parts.is_weekend);
}

#[test]
fn calendar_flags_weekend() {
    // 2025-01-04 is a Saturday.
    let parts = Timestamp::from_unix_millis(JAN_FIRST_2025 + 3 * MILLIS_PER_DAY).calendar();
    assert_eq!(parts.day_of_week, 5);
    assert!(parts.is_weekend);
}

#[test]
fn minus_hours_shifts_backwards() {
    let ts = Timestamp::from_unix_millis(JAN_FIRST_2025);
    assert_eq!(ts.minus_hours(24).unix_millis(), JAN_FIRST_2025 - MILLIS_PER_DAY);
}

#[test]
fn days_until_clamps_negative_spans() {
    let early = Timestamp::from_unix_millis(JAN_FIRST_2025);
    let late = Timestamp::from_unix_millis(JAN_FIRST_2025 + 400 * MILLIS_PER_DAY);
    assert_eq!(early.days_until(late), 400);
    assert_eq!(late.days_until(early), 0);
}

#[test]
fn rfc3339_renders_utc() {
    let rendered = Timestamp::from_unix_millis(JAN_FIRST_2025).to_rfc3339();
    assert!(rendered.starts_with("2025-01-01T00:00:00"));
}

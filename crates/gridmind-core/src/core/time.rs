// gridmind-core/src/core/time.rs
// ============================================================================
// Module: Gridmind Time Model
// Description: Canonical timestamp representation for jobs, trials, and features.
// Purpose: Provide explicit, serializable time values with calendar helpers.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Gridmind stores time as unix-epoch milliseconds. Calendar decomposition
//! (hour of day, weekday, month) is derived through UTC and used by the
//! feature store; it never feeds back into stored values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use time::Duration;
use time::OffsetDateTime;
use time::Weekday;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: i64 = 3_600_000;
/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp in unix-epoch milliseconds (UTC).
///
/// # Invariants
/// - Values are explicit; core logic never reads wall-clock time implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wraps a unix-epoch millisecond value.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }

    /// Returns the value in unix-epoch milliseconds.
    #[must_use]
    pub const fn unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp floored to the containing hour.
    #[must_use]
    pub const fn hour_bucket(self) -> Self {
        Self(self.0 - self.0.rem_euclid(MILLIS_PER_HOUR))
    }

    /// Returns the timestamp floored to the containing day.
    #[must_use]
    pub const fn day_bucket(self) -> Self {
        Self(self.0 - self.0.rem_euclid(MILLIS_PER_DAY))
    }

    /// Returns a timestamp shifted by whole hours (saturating).
    #[must_use]
    pub const fn minus_hours(self, hours: i64) -> Self {
        Self(self.0.saturating_sub(hours.saturating_mul(MILLIS_PER_HOUR)))
    }

    /// Returns the span to `later` in whole days, or zero when negative.
    #[must_use]
    pub const fn days_until(self, later: Self) -> i64 {
        let delta = later.0.saturating_sub(self.0);
        if delta <= 0 { 0 } else { delta / MILLIS_PER_DAY }
    }

    /// Decomposes the timestamp into UTC calendar parts.
    #[must_use]
    pub fn calendar(self) -> CalendarParts {
        let seconds = self.0.div_euclid(1_000);
        let datetime = OffsetDateTime::from_unix_timestamp(seconds)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let weekday = weekday_index(datetime.weekday());
        CalendarParts {
            hour_of_day: datetime.hour(),
            day_of_week: weekday,
            day_of_month: datetime.day(),
            month: u8::from(datetime.month()),
            quarter: (u8::from(datetime.month()) - 1) / 3 + 1,
            is_weekend: weekday >= 5,
        }
    }

    /// Converts to an RFC 3339 string for human-facing output.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        let seconds = self.0.div_euclid(1_000);
        let datetime = OffsetDateTime::from_unix_timestamp(seconds)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        datetime
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| self.0.to_string())
    }

    /// Adds a duration (saturating at the representable bounds).
    #[must_use]
    pub fn plus(self, duration: Duration) -> Self {
        let millis = duration.whole_milliseconds();
        let clamped = i64::try_from(millis)
            .unwrap_or(if millis.is_negative() { i64::MIN } else { i64::MAX });
        Self(self.0.saturating_add(clamped))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// UTC calendar decomposition of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarParts {
    /// Hour of day in [0, 23].
    pub hour_of_day: u8,
    /// Day of week with Monday = 0.
    pub day_of_week: u8,
    /// Day of month in [1, 31].
    pub day_of_month: u8,
    /// Month in [1, 12].
    pub month: u8,
    /// Quarter in [1, 4].
    pub quarter: u8,
    /// True for Saturday and Sunday.
    pub is_weekend: bool,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a weekday to the Monday = 0 convention.
const fn weekday_index(weekday: Weekday) -> u8 {
    match weekday {
        Weekday::Monday => 0,
        Weekday::Tuesday => 1,
        Weekday::Wednesday => 2,
        Weekday::Thursday => 3,
        Weekday::Friday => 4,
        Weekday::Saturday => 5,
        Weekday::Sunday => 6,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;

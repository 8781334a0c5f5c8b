//! Injected environment dependencies.
//!
//! Time is the only ambient dependency the engines need. It is abstracted
//! behind the [`Clock`] trait so expiry and fraud-window logic stay
//! deterministic under test; `wereda-testing` provides fixed and stepping
//! clocks.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// UTC midnight of the day containing `now`.
///
/// Daily aggregates ("served today", "expired today") are bucketed by this
/// boundary.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |midnight| midnight.and_utc())
}

//! Abuse detection for ticket creation.
//!
//! Advisory heuristics over a citizen's ticket history, evaluated only when
//! a new ticket is requested. The policy never blocks on identity, only on
//! request pattern; a flagged request is rejected and audited but creates
//! no ticket.

use chrono::Duration;

/// Thresholds for flagging suspicious request patterns.
#[derive(Clone, Debug)]
pub struct FraudPolicy {
    /// Rule 1: flag when at least this many tickets in an active status were
    /// created within [`Self::activity_window`].
    pub max_active_in_window: u64,
    /// Trailing window for rule 1.
    pub activity_window: Duration,
    /// Rule 2: flag when at least this many tickets ever ended cancelled or
    /// expired, regardless of when.
    pub max_terminal_failures: u64,
}

impl FraudPolicy {
    /// Evaluate the policy against counts supplied by the store.
    ///
    /// `recent_active` is the number of active-status tickets created inside
    /// the activity window; `terminal_failures` is the citizen's lifetime
    /// count of cancelled or expired tickets. Either rule alone flags.
    #[must_use]
    pub const fn is_suspicious(&self, recent_active: u64, terminal_failures: u64) -> bool {
        recent_active >= self.max_active_in_window
            || terminal_failures >= self.max_terminal_failures
    }
}

impl Default for FraudPolicy {
    fn default() -> Self {
        Self {
            max_active_in_window: 5,
            activity_window: Duration::hours(1),
            max_terminal_failures: 10,
        }
    }
}

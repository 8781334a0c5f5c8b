//! Error taxonomy for queue operations.
//!
//! One variant per rejection category so callers (the HTTP layer in
//! particular) can map outcomes without string matching: validation,
//! conflict, forbidden, not-found, resource exhaustion, fraud, and store
//! faults are all distinct. Every rejection leaves the store untouched,
//! apart from the audit record some refused attempts must leave behind
//! (fraud flags, identity mismatches).

use crate::store::StoreError;
use crate::ticket_code::TicketCode;
use crate::types::{CounterId, TicketStatus};
use thiserror::Error;

/// Failure modes of the lifecycle and assignment engines.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Malformed or missing input; nothing was read or written.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The citizen already holds an active ticket; the rejection names it.
    #[error("citizen already holds active ticket {existing}")]
    DuplicateActiveTicket {
        /// Code of the ticket already held.
        existing: TicketCode,
    },

    /// The citizen is barred from creating tickets.
    #[error("citizen is blacklisted")]
    Blacklisted {
        /// Operator-supplied reason, if recorded.
        reason: Option<String>,
    },

    /// The fraud policy flagged the request pattern; audited, no ticket.
    #[error("too many ticket requests")]
    SuspiciousActivity,

    /// The presented raw identifier does not hash-match the ticket.
    #[error("identity does not match ticket")]
    IdentityMismatch,

    /// No ticket with this code exists.
    #[error("ticket {0} not found")]
    TicketNotFound(TicketCode),

    /// No counter with this id exists.
    #[error("counter {0} not found")]
    CounterNotFound(CounterId),

    /// The identity has no active tickets to operate on.
    #[error("no active tickets found for this identity")]
    NoActiveTickets,

    /// No citizen record exists for this identity digest.
    #[error("citizen not found")]
    CitizenNotFound,

    /// The counter exists but is deactivated.
    #[error("counter {0} is not active")]
    CounterInactive(u32),

    /// The counter already holds a called or serving ticket.
    #[error("counter {0} is already serving a ticket")]
    CounterOccupied(u32),

    /// A counter with this number already exists.
    #[error("counter number {0} already exists")]
    DuplicateCounterNumber(u32),

    /// The ticket is not in a state that permits the requested transition.
    #[error("ticket {code} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Ticket the transition was requested for.
        code: TicketCode,
        /// Status the ticket is currently in.
        from: TicketStatus,
        /// Status the operation wanted to reach.
        to: TicketStatus,
    },

    /// No counters have been provisioned at all.
    #[error("no counters configured")]
    NoCountersConfigured,

    /// No waiting, unexpired ticket is available to assign.
    #[error("no waiting tickets to assign")]
    NoWaitingTickets,

    /// Every active counter currently holds a ticket.
    #[error("all counters are currently busy")]
    AllCountersBusy,

    /// The record store failed; surfaced as a generic server fault.
    #[error(transparent)]
    Store(#[from] StoreError),
}

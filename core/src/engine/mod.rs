//! The ticket lifecycle and counter assignment engines.
//!
//! [`QueueEngine`] is the single entry point for every state-changing and
//! read-side operation. Each public method opens exactly one store
//! transaction, performs its decision-relevant reads, its writes, and its
//! audit append inside it, and commits - so a rejection never leaves a
//! partial mutation behind, and the audit record always lands together with
//! the state change it describes.
//!
//! Module layout:
//! - [`lifecycle`]: create, status (with lazy expiry), cancel, cancel-all,
//!   force-expire, complete.
//! - [`assignment`]: call-next, manual assignment, assign-to-next-free
//!   counter, verification at the counter.
//! - [`counters`]: operator provisioning and updates.
//! - [`citizens`]: admin blacklist actions.
//! - [`projections`]: display-board and statistics aggregates.

pub mod assignment;
pub mod citizens;
pub mod counters;
pub mod lifecycle;
pub mod projections;

pub use assignment::CallOutcome;
pub use counters::{CounterSpec, CounterUpdate};
pub use lifecycle::{TicketDetails, TicketRequest};
pub use projections::{QueueStatus, ServingEntry, Statistics, WaitingEntry};

use crate::environment::Clock;
use crate::fraud::FraudPolicy;
use crate::store::{QueueStore, StoreError, StoreTx};
use crate::types::{Counter, Ticket, TicketStatus};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Tunable engine parameters, environment-sourced in production.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Validity window added to the creation time to fix `expires_at`.
    pub expiry_window: Duration,
    /// Mean minutes per service, used for the estimated-wait hint.
    pub avg_service_minutes: i64,
    /// Secret keying the signed ticket payload tokens.
    pub token_secret: String,
    /// Thresholds for the creation-time fraud check.
    pub fraud: FraudPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expiry_window: Duration::hours(2),
            avg_service_minutes: 5,
            token_secret: "wereda-dev-secret-change-in-production".to_string(),
            fraud: FraudPolicy::default(),
        }
    }
}

/// The queue engine: lifecycle, assignment, and read-side projections over
/// one transactional store.
pub struct QueueEngine {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl QueueEngine {
    /// Assemble an engine over `store` with time injected via `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn QueueStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Estimated wait in minutes for a given queue position.
    pub(crate) fn estimated_wait(&self, position: u64) -> i64 {
        i64::try_from(position)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.config.avg_service_minutes)
    }
}

/// Stamp a waiting ticket as called at `counter` and occupy the counter.
pub(crate) fn claim(ticket: &mut Ticket, counter: &mut Counter, now: DateTime<Utc>) {
    ticket.status = TicketStatus::Called;
    ticket.counter_number = Some(counter.number);
    ticket.called_at = Some(now);
    counter.current_ticket = Some(ticket.id);
}

/// Clear the held-ticket reference of the counter holding `ticket`, if any.
///
/// Called whenever a called or serving ticket leaves the counter (complete,
/// cancel, force-expire) so the counter invariant - held reference iff one
/// called/serving ticket bears its number - survives every exit path.
pub(crate) async fn release_holding_counter(
    tx: &mut dyn StoreTx,
    ticket: &Ticket,
) -> Result<(), StoreError> {
    let Some(number) = ticket.counter_number else {
        return Ok(());
    };
    let Some(mut counter) = tx.find_counter_by_number(number).await? else {
        return Ok(());
    };
    if counter.current_ticket == Some(ticket.id) {
        counter.current_ticket = None;
        tx.update_counter(&counter).await?;
    }
    Ok(())
}

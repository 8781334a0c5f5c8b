//! Transactional record store abstraction.
//!
//! The engines never talk to a database directly; they open a [`StoreTx`]
//! through [`QueueStore::begin`], perform every decision-relevant read and
//! every write of one operation inside it, and commit. Dropping a
//! transaction without committing discards all of its writes.
//!
//! # Isolation contract
//!
//! Implementations must guarantee that two concurrent transactions cannot
//! both observe "available" and both mutate the same rows: two call-next
//! invocations must never claim the same ticket, and two creations for one
//! identity must never both pass the one-active-ticket check. The
//! `PostgresQueueStore` (in `wereda-postgres`) achieves this with row-level
//! `FOR UPDATE` locks and `SKIP LOCKED` claims; the `MemoryQueueStore`
//! (in `wereda-testing`) simply serializes transactions behind one lock.
//!
//! # Dyn compatibility
//!
//! Both traits are object-safe (`async_trait`) so the engine can hold an
//! `Arc<dyn QueueStore>` and remain storage-agnostic.

use crate::identity::IdentityHash;
use crate::ticket_code::TicketCode;
use crate::types::{AuditEntry, Citizen, Counter, CounterId, ServiceCategory, Ticket, TicketId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database failed or the connection was lost.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Handle to a transactional queue store.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when a transaction cannot be opened.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

/// One atomic unit of work against the store.
///
/// All methods take `&mut self`; a transaction is used from a single task.
/// Writes become visible to other transactions only after [`StoreTx::commit`].
#[allow(clippy::missing_errors_doc)] // every method: Database on I/O failure, Corrupt on undecodable rows
#[async_trait]
pub trait StoreTx: Send {
    // ------------------------------------------------------------------
    // Citizens
    // ------------------------------------------------------------------

    /// Fetch the citizen for `hash`, creating the record if none exists.
    ///
    /// Implementations must serialize concurrent calls for the same hash
    /// (this is the anchor lock for the one-active-ticket rule).
    async fn find_or_create_citizen(
        &mut self,
        hash: &IdentityHash,
        full_name: &str,
        phone_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Citizen, StoreError>;

    /// Fetch the citizen for `hash`, if any.
    async fn find_citizen(&mut self, hash: &IdentityHash) -> Result<Option<Citizen>, StoreError>;

    /// Persist updated citizen fields (blacklist flag and reason).
    async fn update_citizen(&mut self, citizen: &Citizen) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------

    /// Consume and return the next value of the monotonic ticket sequence.
    async fn next_ticket_sequence(&mut self) -> Result<i64, StoreError>;

    /// Insert a freshly created ticket.
    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Persist updated ticket fields (status, counter, timestamps).
    async fn update_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Fetch a ticket by code, locking it for the rest of the transaction.
    async fn find_ticket(&mut self, code: &TicketCode) -> Result<Option<Ticket>, StoreError>;

    /// All tickets for `hash` in an active status, oldest first.
    async fn active_tickets_for_identity(
        &mut self,
        hash: &IdentityHash,
    ) -> Result<Vec<Ticket>, StoreError>;

    /// Number of active-status tickets for `hash` created at or after `since`.
    async fn count_active_created_since(
        &mut self,
        hash: &IdentityHash,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Lifetime count of this identity's cancelled or expired tickets.
    async fn count_terminal_failures(&mut self, hash: &IdentityHash) -> Result<u64, StoreError>;

    /// Number of waiting tickets in `category`.
    async fn count_waiting_in_category(
        &mut self,
        category: ServiceCategory,
    ) -> Result<u64, StoreError>;

    /// Number of waiting tickets in `category` created before `before`.
    async fn count_waiting_ahead(
        &mut self,
        category: ServiceCategory,
        before: TicketId,
    ) -> Result<u64, StoreError>;

    /// Claim-read the oldest waiting, unexpired ticket within `categories`.
    ///
    /// The returned ticket is locked so a concurrent claimer sees the next
    /// candidate instead.
    async fn next_waiting_in_categories(
        &mut self,
        categories: &[ServiceCategory],
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError>;

    /// Claim-read the globally oldest waiting, unexpired ticket.
    async fn next_waiting_global(&mut self, now: DateTime<Utc>)
    -> Result<Option<Ticket>, StoreError>;

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    /// Insert a newly provisioned counter.
    async fn insert_counter(&mut self, counter: &Counter) -> Result<(), StoreError>;

    /// Persist updated counter fields.
    async fn update_counter(&mut self, counter: &Counter) -> Result<(), StoreError>;

    /// Fetch a counter by id, locking it for the rest of the transaction.
    async fn find_counter(&mut self, id: CounterId) -> Result<Option<Counter>, StoreError>;

    /// Fetch a counter by its operator-visible number, locking it.
    async fn find_counter_by_number(&mut self, number: u32)
    -> Result<Option<Counter>, StoreError>;

    /// All counters, ordered by counter number.
    async fn list_counters(&mut self) -> Result<Vec<Counter>, StoreError>;

    /// Active counters only, ordered by counter number.
    async fn active_counters(&mut self) -> Result<Vec<Counter>, StoreError>;

    /// Numbers of counters currently linked to a called or serving ticket.
    async fn busy_counter_numbers(&mut self) -> Result<HashSet<u32>, StoreError>;

    // ------------------------------------------------------------------
    // Audit log
    // ------------------------------------------------------------------

    /// Append one audit entry.
    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Projection reads
    // ------------------------------------------------------------------

    /// Tickets currently called or serving, ordered by counter number.
    async fn serving_tickets(&mut self) -> Result<Vec<Ticket>, StoreError>;

    /// Waiting tickets with a live deadline, oldest first.
    async fn waiting_tickets_ordered(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError>;

    /// Number of tickets in waiting status.
    async fn count_waiting(&mut self) -> Result<u64, StoreError>;

    /// Number of tickets created at or after `since`.
    async fn count_created_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Number of tickets completed at or after `since`.
    async fn count_completed_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Number of expired tickets created at or after `since`.
    async fn count_expired_created_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Number of active counters.
    async fn count_active_counters(&mut self) -> Result<u64, StoreError>;

    /// Served-to-completed spans, in seconds, of tickets completed at or
    /// after `since`.
    async fn service_durations_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError>;

    // ------------------------------------------------------------------

    /// Commit every write performed in this transaction.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

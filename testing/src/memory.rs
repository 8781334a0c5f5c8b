//! In-memory implementation of the queue store traits.
//!
//! `MemoryQueueStore` serializes transactions behind a single async lock:
//! `begin` takes the lock and snapshots the state, every write goes to the
//! snapshot, and `commit` publishes it. Dropping a transaction without
//! committing discards the snapshot, which gives real rollback semantics.
//! One writer at a time trivially satisfies the isolation contract the
//! engines rely on, which is what makes this the reference store for
//! engine, concurrency, and HTTP tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use wereda_core::identity::IdentityHash;
use wereda_core::store::{QueueStore, StoreError, StoreTx};
use wereda_core::ticket_code::TicketCode;
use wereda_core::types::{
    AuditEntry, Citizen, CitizenId, Counter, CounterId, ServiceCategory, Ticket, TicketId,
    TicketStatus,
};

#[derive(Clone, Debug, Default)]
struct MemoryState {
    /// Citizens keyed by identity digest.
    citizens: HashMap<String, Citizen>,
    /// Tickets keyed by sequence id; iteration order is creation order.
    tickets: BTreeMap<i64, Ticket>,
    /// Ticket code -> sequence id.
    codes: HashMap<String, i64>,
    counters: HashMap<CounterId, Counter>,
    audit_log: Vec<AuditEntry>,
    ticket_seq: i64,
}

/// In-memory transactional queue store.
#[derive(Clone, Default)]
pub struct MemoryQueueStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryQueueStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit log, for test assertions.
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit_log.clone()
    }

    /// Look up a ticket by code, for test assertions.
    pub async fn ticket(&self, code: &TicketCode) -> Option<Ticket> {
        let state = self.state.lock().await;
        state
            .codes
            .get(code.as_str())
            .and_then(|id| state.tickets.get(id))
            .cloned()
    }

    /// Look up a counter by id, for test assertions.
    pub async fn counter(&self, id: CounterId) -> Option<Counter> {
        self.state.lock().await.counters.get(&id).cloned()
    }

    /// Look up a citizen by identity digest, for test assertions.
    pub async fn citizen(&self, hash: &IdentityHash) -> Option<Citizen> {
        self.state.lock().await.citizens.get(hash.as_str()).cloned()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

impl MemoryTx {
    fn tickets_for(&self, hash: &IdentityHash) -> impl Iterator<Item = &Ticket> {
        self.work
            .tickets
            .values()
            .filter(move |ticket| ticket.identity_hash == *hash)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_or_create_citizen(
        &mut self,
        hash: &IdentityHash,
        full_name: &str,
        phone_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Citizen, StoreError> {
        let citizen = self
            .work
            .citizens
            .entry(hash.as_str().to_string())
            .or_insert_with(|| {
                Citizen::new(
                    CitizenId::new(),
                    hash.clone(),
                    full_name.to_string(),
                    phone_number.map(str::to_string),
                    now,
                )
            });
        Ok(citizen.clone())
    }

    async fn find_citizen(&mut self, hash: &IdentityHash) -> Result<Option<Citizen>, StoreError> {
        Ok(self.work.citizens.get(hash.as_str()).cloned())
    }

    async fn update_citizen(&mut self, citizen: &Citizen) -> Result<(), StoreError> {
        self.work
            .citizens
            .insert(citizen.identity_hash.as_str().to_string(), citizen.clone());
        Ok(())
    }

    async fn next_ticket_sequence(&mut self) -> Result<i64, StoreError> {
        self.work.ticket_seq += 1;
        Ok(self.work.ticket_seq)
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.work
            .codes
            .insert(ticket.code.as_str().to_string(), ticket.id.value());
        self.work.tickets.insert(ticket.id.value(), ticket.clone());
        Ok(())
    }

    async fn update_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.work.tickets.insert(ticket.id.value(), ticket.clone());
        Ok(())
    }

    async fn find_ticket(&mut self, code: &TicketCode) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .work
            .codes
            .get(code.as_str())
            .and_then(|id| self.work.tickets.get(id))
            .cloned())
    }

    async fn active_tickets_for_identity(
        &mut self,
        hash: &IdentityHash,
    ) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .tickets_for(hash)
            .filter(|ticket| ticket.is_active())
            .cloned()
            .collect())
    }

    async fn count_active_created_since(
        &mut self,
        hash: &IdentityHash,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self
            .tickets_for(hash)
            .filter(|ticket| ticket.is_active() && ticket.created_at >= since)
            .count() as u64)
    }

    async fn count_terminal_failures(&mut self, hash: &IdentityHash) -> Result<u64, StoreError> {
        Ok(self
            .tickets_for(hash)
            .filter(|ticket| {
                matches!(
                    ticket.status,
                    TicketStatus::Cancelled | TicketStatus::Expired
                )
            })
            .count() as u64)
    }

    async fn count_waiting_in_category(
        &mut self,
        category: ServiceCategory,
    ) -> Result<u64, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| ticket.status == TicketStatus::Waiting && ticket.category == category)
            .count() as u64)
    }

    async fn count_waiting_ahead(
        &mut self,
        category: ServiceCategory,
        before: TicketId,
    ) -> Result<u64, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| {
                ticket.status == TicketStatus::Waiting
                    && ticket.category == category
                    && ticket.id < before
            })
            .count() as u64)
    }

    async fn next_waiting_in_categories(
        &mut self,
        categories: &[ServiceCategory],
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .find(|ticket| {
                ticket.status == TicketStatus::Waiting
                    && categories.contains(&ticket.category)
                    && ticket.expires_at > now
            })
            .cloned())
    }

    async fn next_waiting_global(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .find(|ticket| ticket.status == TicketStatus::Waiting && ticket.expires_at > now)
            .cloned())
    }

    async fn insert_counter(&mut self, counter: &Counter) -> Result<(), StoreError> {
        self.work.counters.insert(counter.id, counter.clone());
        Ok(())
    }

    async fn update_counter(&mut self, counter: &Counter) -> Result<(), StoreError> {
        self.work.counters.insert(counter.id, counter.clone());
        Ok(())
    }

    async fn find_counter(&mut self, id: CounterId) -> Result<Option<Counter>, StoreError> {
        Ok(self.work.counters.get(&id).cloned())
    }

    async fn find_counter_by_number(
        &mut self,
        number: u32,
    ) -> Result<Option<Counter>, StoreError> {
        Ok(self
            .work
            .counters
            .values()
            .find(|counter| counter.number == number)
            .cloned())
    }

    async fn list_counters(&mut self) -> Result<Vec<Counter>, StoreError> {
        let mut counters: Vec<Counter> = self.work.counters.values().cloned().collect();
        counters.sort_by_key(|counter| counter.number);
        Ok(counters)
    }

    async fn active_counters(&mut self) -> Result<Vec<Counter>, StoreError> {
        let mut counters: Vec<Counter> = self
            .work
            .counters
            .values()
            .filter(|counter| counter.active)
            .cloned()
            .collect();
        counters.sort_by_key(|counter| counter.number);
        Ok(counters)
    }

    async fn busy_counter_numbers(&mut self) -> Result<HashSet<u32>, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| {
                matches!(ticket.status, TicketStatus::Called | TicketStatus::Serving)
            })
            .filter_map(|ticket| ticket.counter_number)
            .collect())
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.work.audit_log.push(entry.clone());
        Ok(())
    }

    async fn serving_tickets(&mut self) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self
            .work
            .tickets
            .values()
            .filter(|ticket| {
                matches!(ticket.status, TicketStatus::Called | TicketStatus::Serving)
            })
            .cloned()
            .collect();
        tickets.sort_by_key(|ticket| ticket.counter_number);
        Ok(tickets)
    }

    async fn waiting_tickets_ordered(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| ticket.status == TicketStatus::Waiting && ticket.expires_at > now)
            .cloned()
            .collect())
    }

    async fn count_waiting(&mut self) -> Result<u64, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| ticket.status == TicketStatus::Waiting)
            .count() as u64)
    }

    async fn count_created_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| ticket.created_at >= since)
            .count() as u64)
    }

    async fn count_completed_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| {
                ticket.status == TicketStatus::Completed
                    && ticket.completed_at.is_some_and(|at| at >= since)
            })
            .count() as u64)
    }

    async fn count_expired_created_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| ticket.status == TicketStatus::Expired && ticket.created_at >= since)
            .count() as u64)
    }

    async fn count_active_counters(&mut self) -> Result<u64, StoreError> {
        Ok(self
            .work
            .counters
            .values()
            .filter(|counter| counter.active)
            .count() as u64)
    }

    async fn service_durations_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| {
                ticket.status == TicketStatus::Completed
                    && ticket.completed_at.is_some_and(|at| at >= since)
            })
            .filter_map(|ticket| {
                let served = ticket.served_at?;
                let completed = ticket.completed_at?;
                Some((completed - served).num_seconds())
            })
            .collect())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        *self.guard = std::mem::take(&mut self.work);
        Ok(())
    }
}

//! Store trait implementations over a sqlx transaction.

use crate::PostgresQueueStore;
use crate::rows::{
    CITIZEN_COLUMNS, COUNTER_COLUMNS, CitizenRow, CounterRow, TICKET_COLUMNS, TicketRow,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use std::collections::HashSet;
use uuid::Uuid;
use wereda_core::identity::IdentityHash;
use wereda_core::store::{QueueStore, StoreError, StoreTx};
use wereda_core::ticket_code::TicketCode;
use wereda_core::types::{
    AuditEntry, Citizen, Counter, CounterId, ServiceCategory, Ticket, TicketId,
};

fn db(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

fn pg_int(number: u32) -> i32 {
    i32::try_from(number).unwrap_or(i32::MAX)
}

fn non_negative(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn category_strings(categories: &[ServiceCategory]) -> Vec<String> {
    categories
        .iter()
        .map(|category| category.as_str().to_string())
        .collect()
}

#[async_trait]
impl QueueStore for PostgresQueueStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool().begin().await.map_err(db)?;
        Ok(Box::new(PgTx { tx }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    async fn count(&mut self, sql: &str, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(sql)
            .bind(since)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(non_negative(count))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_or_create_citizen(
        &mut self,
        hash: &IdentityHash,
        full_name: &str,
        phone_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Citizen, StoreError> {
        sqlx::query(
            "INSERT INTO citizens (id, identity_hash, full_name, phone_number, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (identity_hash) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(hash.as_str())
        .bind(full_name)
        .bind(phone_number)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;

        // The row lock is the serialization anchor for this identity.
        let sql =
            format!("SELECT {CITIZEN_COLUMNS} FROM citizens WHERE identity_hash = $1 FOR UPDATE");
        let row: CitizenRow = sqlx::query_as(&sql)
            .bind(hash.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.into_citizen())
    }

    async fn find_citizen(&mut self, hash: &IdentityHash) -> Result<Option<Citizen>, StoreError> {
        let sql =
            format!("SELECT {CITIZEN_COLUMNS} FROM citizens WHERE identity_hash = $1 FOR UPDATE");
        let row: Option<CitizenRow> = sqlx::query_as(&sql)
            .bind(hash.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(CitizenRow::into_citizen))
    }

    async fn update_citizen(&mut self, citizen: &Citizen) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE citizens
             SET full_name = $2, phone_number = $3, is_blacklisted = $4, blacklist_reason = $5
             WHERE id = $1",
        )
        .bind(citizen.id.as_uuid())
        .bind(&citizen.full_name)
        .bind(&citizen.phone_number)
        .bind(citizen.blacklisted)
        .bind(&citizen.blacklist_reason)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn next_ticket_sequence(&mut self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT nextval('ticket_code_seq')")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db)
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tickets (id, ticket_code, citizen_id, identity_hash, full_name,
                                  service_category, status, counter_number, created_at,
                                  called_at, served_at, completed_at, expires_at, payload_token)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(ticket.id.value())
        .bind(ticket.code.as_str())
        .bind(ticket.citizen_id.as_uuid())
        .bind(ticket.identity_hash.as_str())
        .bind(&ticket.full_name)
        .bind(ticket.category.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.counter_number.map(pg_int))
        .bind(ticket.created_at)
        .bind(ticket.called_at)
        .bind(ticket.served_at)
        .bind(ticket.completed_at)
        .bind(ticket.expires_at)
        .bind(&ticket.payload_token)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn update_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        // Creation-time fields (code, identity, category, created_at,
        // expires_at, payload) are immutable by construction.
        sqlx::query(
            "UPDATE tickets
             SET status = $2, counter_number = $3, called_at = $4, served_at = $5,
                 completed_at = $6
             WHERE id = $1",
        )
        .bind(ticket.id.value())
        .bind(ticket.status.as_str())
        .bind(ticket.counter_number.map(pg_int))
        .bind(ticket.called_at)
        .bind(ticket.served_at)
        .bind(ticket.completed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn find_ticket(&mut self, code: &TicketCode) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_code = $1 FOR UPDATE");
        let row: Option<TicketRow> = sqlx::query_as(&sql)
            .bind(code.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        row.map(TicketRow::into_ticket).transpose()
    }

    async fn active_tickets_for_identity(
        &mut self,
        hash: &IdentityHash,
    ) -> Result<Vec<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE identity_hash = $1 AND status IN ('waiting', 'called', 'serving')
             ORDER BY id"
        );
        let rows: Vec<TicketRow> = sqlx::query_as(&sql)
            .bind(hash.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn count_active_created_since(
        &mut self,
        hash: &IdentityHash,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets
             WHERE identity_hash = $1
               AND status IN ('waiting', 'called', 'serving')
               AND created_at >= $2",
        )
        .bind(hash.as_str())
        .bind(since)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(non_negative(count))
    }

    async fn count_terminal_failures(&mut self, hash: &IdentityHash) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets
             WHERE identity_hash = $1 AND status IN ('cancelled', 'expired')",
        )
        .bind(hash.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(non_negative(count))
    }

    async fn count_waiting_in_category(
        &mut self,
        category: ServiceCategory,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE status = 'waiting' AND service_category = $1",
        )
        .bind(category.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(non_negative(count))
    }

    async fn count_waiting_ahead(
        &mut self,
        category: ServiceCategory,
        before: TicketId,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets
             WHERE status = 'waiting' AND service_category = $1 AND id < $2",
        )
        .bind(category.as_str())
        .bind(before.value())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(non_negative(count))
    }

    async fn next_waiting_in_categories(
        &mut self,
        categories: &[ServiceCategory],
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE status = 'waiting' AND service_category = ANY($1) AND expires_at > $2
             ORDER BY id
             LIMIT 1
             FOR UPDATE SKIP LOCKED"
        );
        let row: Option<TicketRow> = sqlx::query_as(&sql)
            .bind(category_strings(categories))
            .bind(now)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        row.map(TicketRow::into_ticket).transpose()
    }

    async fn next_waiting_global(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE status = 'waiting' AND expires_at > $1
             ORDER BY id
             LIMIT 1
             FOR UPDATE SKIP LOCKED"
        );
        let row: Option<TicketRow> = sqlx::query_as(&sql)
            .bind(now)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        row.map(TicketRow::into_ticket).transpose()
    }

    async fn insert_counter(&mut self, counter: &Counter) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO counters (id, counter_number, counter_name, service_categories,
                                   is_active, current_ticket_id, staff_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(counter.id.as_uuid())
        .bind(pg_int(counter.number))
        .bind(&counter.name)
        .bind(category_strings(&counter.categories))
        .bind(counter.active)
        .bind(counter.current_ticket.map(TicketId::value))
        .bind(&counter.staff_name)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn update_counter(&mut self, counter: &Counter) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE counters
             SET counter_name = $2, service_categories = $3, is_active = $4,
                 current_ticket_id = $5, staff_name = $6
             WHERE id = $1",
        )
        .bind(counter.id.as_uuid())
        .bind(&counter.name)
        .bind(category_strings(&counter.categories))
        .bind(counter.active)
        .bind(counter.current_ticket.map(TicketId::value))
        .bind(&counter.staff_name)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn find_counter(&mut self, id: CounterId) -> Result<Option<Counter>, StoreError> {
        let sql = format!("SELECT {COUNTER_COLUMNS} FROM counters WHERE id = $1 FOR UPDATE");
        let row: Option<CounterRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        row.map(CounterRow::into_counter).transpose()
    }

    async fn find_counter_by_number(
        &mut self,
        number: u32,
    ) -> Result<Option<Counter>, StoreError> {
        let sql =
            format!("SELECT {COUNTER_COLUMNS} FROM counters WHERE counter_number = $1 FOR UPDATE");
        let row: Option<CounterRow> = sqlx::query_as(&sql)
            .bind(pg_int(number))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        row.map(CounterRow::into_counter).transpose()
    }

    async fn list_counters(&mut self) -> Result<Vec<Counter>, StoreError> {
        let sql = format!("SELECT {COUNTER_COLUMNS} FROM counters ORDER BY counter_number");
        let rows: Vec<CounterRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        rows.into_iter().map(CounterRow::into_counter).collect()
    }

    async fn active_counters(&mut self) -> Result<Vec<Counter>, StoreError> {
        let sql = format!(
            "SELECT {COUNTER_COLUMNS} FROM counters WHERE is_active ORDER BY counter_number"
        );
        let rows: Vec<CounterRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        rows.into_iter().map(CounterRow::into_counter).collect()
    }

    async fn busy_counter_numbers(&mut self) -> Result<HashSet<u32>, StoreError> {
        let numbers: Vec<i32> = sqlx::query_scalar(
            "SELECT DISTINCT counter_number FROM tickets
             WHERE counter_number IS NOT NULL AND status IN ('called', 'serving')",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(numbers
            .into_iter()
            .filter_map(|n| u32::try_from(n).ok())
            .collect())
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_log (action, citizen_id, ticket_id, counter_id, details,
                                    is_suspicious, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.action.as_str())
        .bind(entry.citizen_id.map(|id| *id.as_uuid()))
        .bind(entry.ticket_id.map(TicketId::value))
        .bind(entry.counter_id.map(|id| *id.as_uuid()))
        .bind(&entry.details)
        .bind(entry.suspicious)
        .bind(entry.at)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn serving_tickets(&mut self) -> Result<Vec<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE status IN ('called', 'serving')
             ORDER BY counter_number"
        );
        let rows: Vec<TicketRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn waiting_tickets_ordered(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE status = 'waiting' AND expires_at > $1
             ORDER BY id"
        );
        let rows: Vec<TicketRow> = sqlx::query_as(&sql)
            .bind(now)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn count_waiting(&mut self) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE status = 'waiting'")
                .fetch_one(&mut *self.tx)
                .await
                .map_err(db)?;
        Ok(non_negative(count))
    }

    async fn count_created_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM tickets WHERE created_at >= $1", since)
            .await
    }

    async fn count_completed_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        self.count(
            "SELECT COUNT(*) FROM tickets WHERE status = 'completed' AND completed_at >= $1",
            since,
        )
        .await
    }

    async fn count_expired_created_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.count(
            "SELECT COUNT(*) FROM tickets WHERE status = 'expired' AND created_at >= $1",
            since,
        )
        .await
    }

    async fn count_active_counters(&mut self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counters WHERE is_active")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(non_negative(count))
    }

    async fn service_durations_since(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        sqlx::query_scalar(
            "SELECT EXTRACT(EPOCH FROM (completed_at - served_at))::BIGINT
             FROM tickets
             WHERE status = 'completed' AND completed_at >= $1 AND served_at IS NOT NULL",
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(db)
    }
}

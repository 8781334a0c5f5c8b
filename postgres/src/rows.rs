//! Row types bridging `PostgreSQL` records and domain values.
//!
//! Enum-ish columns (status, category, audit action) are stored as their
//! snake-case/tag strings; a row that fails to parse back surfaces as
//! [`StoreError::Corrupt`] rather than panicking or silently defaulting.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wereda_core::identity::IdentityHash;
use wereda_core::store::StoreError;
use wereda_core::ticket_code::TicketCode;
use wereda_core::types::{
    Citizen, CitizenId, Counter, CounterId, ServiceCategory, Ticket, TicketId, TicketStatus,
};

pub(crate) const TICKET_COLUMNS: &str = "id, ticket_code, citizen_id, identity_hash, full_name, \
     service_category, status, counter_number, created_at, called_at, served_at, completed_at, \
     expires_at, payload_token";

pub(crate) const CITIZEN_COLUMNS: &str =
    "id, identity_hash, full_name, phone_number, created_at, is_blacklisted, blacklist_reason";

pub(crate) const COUNTER_COLUMNS: &str =
    "id, counter_number, counter_name, service_categories, is_active, current_ticket_id, staff_name";

#[derive(sqlx::FromRow)]
pub(crate) struct CitizenRow {
    id: Uuid,
    identity_hash: String,
    full_name: String,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
    is_blacklisted: bool,
    blacklist_reason: Option<String>,
}

impl CitizenRow {
    pub(crate) fn into_citizen(self) -> Citizen {
        Citizen {
            id: CitizenId::from_uuid(self.id),
            identity_hash: IdentityHash::from_hex(self.identity_hash),
            full_name: self.full_name,
            phone_number: self.phone_number,
            created_at: self.created_at,
            blacklisted: self.is_blacklisted,
            blacklist_reason: self.blacklist_reason,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct TicketRow {
    id: i64,
    ticket_code: String,
    citizen_id: Uuid,
    identity_hash: String,
    full_name: String,
    service_category: String,
    status: String,
    counter_number: Option<i32>,
    created_at: DateTime<Utc>,
    called_at: Option<DateTime<Utc>>,
    served_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    payload_token: String,
}

impl TicketRow {
    pub(crate) fn into_ticket(self) -> Result<Ticket, StoreError> {
        let category = ServiceCategory::parse(&self.service_category).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown service category {}", self.service_category))
        })?;
        let status = TicketStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown ticket status {}", self.status)))?;
        let counter_number = self
            .counter_number
            .map(|n| {
                u32::try_from(n).map_err(|_| {
                    StoreError::Corrupt(format!("negative counter number {n} on ticket {}", self.id))
                })
            })
            .transpose()?;

        Ok(Ticket {
            id: TicketId::new(self.id),
            code: TicketCode::new(self.ticket_code),
            citizen_id: CitizenId::from_uuid(self.citizen_id),
            identity_hash: IdentityHash::from_hex(self.identity_hash),
            full_name: self.full_name,
            category,
            status,
            counter_number,
            created_at: self.created_at,
            called_at: self.called_at,
            served_at: self.served_at,
            completed_at: self.completed_at,
            expires_at: self.expires_at,
            payload_token: self.payload_token,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CounterRow {
    id: Uuid,
    counter_number: i32,
    counter_name: String,
    service_categories: Vec<String>,
    is_active: bool,
    current_ticket_id: Option<i64>,
    staff_name: Option<String>,
}

impl CounterRow {
    pub(crate) fn into_counter(self) -> Result<Counter, StoreError> {
        let number = u32::try_from(self.counter_number).map_err(|_| {
            StoreError::Corrupt(format!("negative counter number {}", self.counter_number))
        })?;
        let categories = self
            .service_categories
            .iter()
            .map(|raw| {
                ServiceCategory::parse(raw).ok_or_else(|| {
                    StoreError::Corrupt(format!("unknown service category {raw} on counter {number}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Counter {
            id: CounterId::from_uuid(self.id),
            number,
            name: self.counter_name,
            categories,
            active: self.is_active,
            current_ticket: self.current_ticket_id.map(TicketId::new),
            staff_name: self.staff_name,
        })
    }
}

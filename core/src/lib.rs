//! # Wereda Core
//!
//! Domain model and queue engines for the Wereda walk-in queue management
//! system: citizens pull a ticket for a government service category, wait to
//! be called to a counter, and are verified and served there.
//!
//! ## Components
//!
//! - **Identity hashing** ([`identity`]): raw identifiers are reduced to a
//!   one-way SHA-256 digest at the boundary and never stored.
//! - **Ticket codes** ([`ticket_code`]): human-readable `IM-045` style codes
//!   from a per-category prefix table and a monotonic sequence.
//! - **Fraud policy** ([`fraud`]): threshold checks over a citizen's recent
//!   ticket history, evaluated at creation time.
//! - **Lifecycle engine** ([`engine`]): the ticket state machine
//!   (`waiting → called → serving → completed`, with cancellation and
//!   expiry exits) and the one-active-ticket-per-citizen rule.
//! - **Assignment engine** ([`engine`]): matches waiting tickets to idle
//!   counters, counter-initiated (call-next) or ticket-initiated
//!   (assign-to-next-free-counter).
//! - **Projections** ([`engine::projections`]): read-only aggregates for
//!   display boards and daily statistics.
//! - **Store abstraction** ([`store`]): a transactional record store; every
//!   engine operation runs as a single atomic transaction against it.
//!
//! ## Concurrency model
//!
//! The engine never holds in-process queues or locks of its own. All
//! decision-relevant reads and the resulting writes for one operation happen
//! inside one [`store::StoreTx`]; the store implementation guarantees that
//! two concurrent operations cannot both observe "available" and both
//! mutate. Expiry is evaluated lazily against the stored deadline at every
//! read and claim site, so correctness never depends on a background sweep.

pub mod engine;
pub mod environment;
pub mod error;
pub mod fraud;
pub mod identity;
pub mod store;
pub mod ticket_code;
pub mod token;
pub mod types;

pub use engine::{EngineConfig, QueueEngine};
pub use error::QueueError;
pub use fraud::FraudPolicy;
pub use identity::IdentityHash;
pub use ticket_code::TicketCode;
pub use types::{
    AuditAction, AuditEntry, Citizen, CitizenId, Counter, CounterId, ServiceCategory, Ticket,
    TicketId, TicketStatus,
};

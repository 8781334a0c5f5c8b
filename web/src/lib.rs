//! # Wereda Web
//!
//! Axum HTTP surface for the Wereda queue system.
//!
//! Three audiences share the API, mirroring the service-hall hardware:
//!
//! - **Kiosk**: create tickets, check status, cancel.
//! - **Counter**: call next, verify identity, complete, assign.
//! - **Display**: queue status board, waiting list, statistics.
//!
//! Handlers stay thin: they translate DTOs, call one
//! [`wereda_core::QueueEngine`] method, and map [`wereda_core::QueueError`]
//! onto HTTP statuses through [`error::AppError`]. All queueing semantics
//! live in `wereda-core`.

pub mod api;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::build_router;
pub use state::AppState;

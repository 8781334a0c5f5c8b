//! Display-board endpoints.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use wereda_core::engine::{QueueStatus, WaitingEntry};

/// Dashboard listing of waiting tickets.
#[derive(Debug, Serialize)]
pub struct WaitingTicketsResponse {
    /// Number of waiting tickets with a live deadline.
    pub total_waiting: usize,
    /// The tickets, oldest first, with truncated identity digests.
    pub tickets: Vec<WaitingEntry>,
}

/// `GET /api/display/queue-status` - live board aggregates.
pub async fn queue_status(State(state): State<AppState>) -> Result<Json<QueueStatus>, AppError> {
    Ok(Json(state.engine.queue_status().await?))
}

/// `GET /api/display/waiting-tickets` - the waiting list for the dashboard.
pub async fn waiting_tickets(
    State(state): State<AppState>,
) -> Result<Json<WaitingTicketsResponse>, AppError> {
    let tickets = state.engine.waiting_tickets().await?;
    Ok(Json(WaitingTicketsResponse {
        total_waiting: tickets.len(),
        tickets,
    }))
}

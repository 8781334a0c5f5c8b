//! Kiosk-facing ticket endpoints.
//!
//! - `POST /api/tickets` - create a ticket (one active ticket per citizen)
//! - `GET /api/tickets/:code` - status, with lazy expiry on read
//! - `DELETE /api/tickets/:code/cancel` - cancel with identity verification
//! - `DELETE /api/tickets/cancel-by-id` - cancel everything for an identity
//! - `POST /api/tickets/:code/expire` - operator force-expire
//! - `POST /api/tickets/:code/assign-next` - send to the next free counter
//! - `GET /api/tickets/active/:id_number` - list an identity's active tickets

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wereda_core::engine::TicketDetails;
use wereda_core::types::{ServiceCategory, Ticket, TicketStatus};
use wereda_core::{TicketCode, engine::TicketRequest};

/// Request to create a new ticket at the kiosk.
#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    /// Raw citizen identifier; hashed immediately, never stored.
    pub id_number: String,
    /// Display name.
    pub full_name: String,
    /// Requested service category.
    pub service_category: ServiceCategory,
    /// Optional contact number.
    pub phone_number: Option<String>,
}

/// Ticket details returned to the kiosk and status queries.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    /// Human-readable ticket code.
    pub ticket_number: String,
    /// Display name.
    pub full_name: String,
    /// Requested service category.
    pub service_category: ServiceCategory,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// Counter the ticket was called to, if any.
    pub counter_number: Option<u32>,
    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
    /// Fixed validity deadline.
    pub expires_at: DateTime<Utc>,
    /// 1-based position among waiting tickets of the same category.
    pub queue_position: Option<u64>,
    /// Estimated wait in minutes.
    pub estimated_wait_minutes: Option<i64>,
    /// Signed payload the printed QR code encodes.
    pub payload_token: String,
}

impl From<TicketDetails> for TicketResponse {
    fn from(details: TicketDetails) -> Self {
        let ticket = details.ticket;
        Self {
            ticket_number: ticket.code.as_str().to_string(),
            full_name: ticket.full_name,
            service_category: ticket.category,
            status: ticket.status,
            counter_number: ticket.counter_number,
            created_at: ticket.created_at,
            expires_at: ticket.expires_at,
            queue_position: details.queue_position,
            estimated_wait_minutes: details.estimated_wait_minutes,
            payload_token: ticket.payload_token,
        }
    }
}

/// Identity presented via query string for cancel endpoints.
#[derive(Debug, Deserialize)]
pub struct IdentityQuery {
    /// Raw citizen identifier.
    pub id_number: String,
}

/// Response after a single-ticket transition.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    /// Message for the caller.
    pub message: String,
    /// Ticket code.
    pub ticket_number: String,
    /// Status after the transition.
    pub status: TicketStatus,
}

/// Response after an identity-wide cancel.
#[derive(Debug, Serialize)]
pub struct CancelAllResponse {
    /// Message for the caller.
    pub message: String,
    /// Codes of the cancelled tickets.
    pub cancelled_tickets: Vec<String>,
}

/// One active ticket in the identity listing.
#[derive(Debug, Serialize)]
pub struct ActiveTicket {
    /// Ticket code.
    pub ticket_number: String,
    /// Requested service category.
    pub service_category: ServiceCategory,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
    /// Fixed validity deadline.
    pub expires_at: DateTime<Utc>,
}

impl From<Ticket> for ActiveTicket {
    fn from(ticket: Ticket) -> Self {
        Self {
            ticket_number: ticket.code.as_str().to_string(),
            service_category: ticket.category,
            status: ticket.status,
            created_at: ticket.created_at,
            expires_at: ticket.expires_at,
        }
    }
}

/// Listing of an identity's active tickets; empty is a normal result.
#[derive(Debug, Serialize)]
pub struct ActiveTicketsResponse {
    /// Message for the caller.
    pub message: String,
    /// The active tickets.
    pub tickets: Vec<ActiveTicket>,
}

/// Response after sending a ticket to a counter.
#[derive(Debug, Serialize)]
pub struct AssignedResponse {
    /// Message for the caller.
    pub message: String,
    /// Ticket code.
    pub ticket_number: String,
    /// Counter the ticket was sent to.
    pub counter_number: Option<u32>,
}

/// `POST /api/tickets` - create a ticket.
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), AppError> {
    let details = state
        .engine
        .create_ticket(TicketRequest {
            raw_id: request.id_number,
            full_name: request.full_name,
            category: request.service_category,
            phone_number: request.phone_number,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// `GET /api/tickets/:code` - current status.
pub async fn ticket_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<TicketResponse>, AppError> {
    let details = state.engine.ticket_status(&TicketCode::new(code)).await?;
    Ok(Json(details.into()))
}

/// `DELETE /api/tickets/:code/cancel` - cancel with identity verification.
pub async fn cancel_ticket(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(identity): Query<IdentityQuery>,
) -> Result<Json<TransitionResponse>, AppError> {
    let ticket = state
        .engine
        .cancel_ticket(&TicketCode::new(code), &identity.id_number)
        .await?;
    Ok(Json(TransitionResponse {
        message: "Ticket cancelled successfully".to_string(),
        ticket_number: ticket.code.as_str().to_string(),
        status: ticket.status,
    }))
}

/// `DELETE /api/tickets/cancel-by-id` - cancel every active ticket for an
/// identity.
pub async fn cancel_all_by_identity(
    State(state): State<AppState>,
    Query(identity): Query<IdentityQuery>,
) -> Result<Json<CancelAllResponse>, AppError> {
    let cancelled = state
        .engine
        .cancel_all_for_identity(&identity.id_number)
        .await?;
    Ok(Json(CancelAllResponse {
        message: format!("Cancelled {} ticket(s)", cancelled.len()),
        cancelled_tickets: cancelled
            .into_iter()
            .map(|code| code.as_str().to_string())
            .collect(),
    }))
}

/// `POST /api/tickets/:code/expire` - operator force-expire.
pub async fn force_expire(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    let ticket = state.engine.force_expire(&TicketCode::new(code)).await?;
    Ok(Json(TransitionResponse {
        message: "Ticket expired successfully".to_string(),
        ticket_number: ticket.code.as_str().to_string(),
        status: ticket.status,
    }))
}

/// `POST /api/tickets/:code/assign-next` - send this waiting ticket to the
/// next free counter.
pub async fn assign_to_next_counter(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<AssignedResponse>, AppError> {
    let ticket = state
        .engine
        .assign_next(Some(&TicketCode::new(code)))
        .await?;
    Ok(Json(AssignedResponse {
        message: "Ticket assigned".to_string(),
        ticket_number: ticket.code.as_str().to_string(),
        counter_number: ticket.counter_number,
    }))
}

/// `GET /api/tickets/active/:id_number` - active tickets for an identity.
pub async fn active_tickets(
    State(state): State<AppState>,
    Path(id_number): Path<String>,
) -> Result<Json<ActiveTicketsResponse>, AppError> {
    let tickets = state.engine.active_tickets_for_identity(&id_number).await?;
    let message = if tickets.is_empty() {
        "No active tickets found".to_string()
    } else {
        format!("Found {} active ticket(s)", tickets.len())
    };
    Ok(Json(ActiveTicketsResponse {
        message,
        tickets: tickets.into_iter().map(ActiveTicket::from).collect(),
    }))
}

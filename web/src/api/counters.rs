//! Counter-facing endpoints: provisioning, claiming, verification.
//!
//! - `POST /api/counters` - provision a counter
//! - `GET /api/counters` - list counters
//! - `PUT /api/counters/:id` - activate/deactivate, staff label
//! - `POST /api/counters/:id/call-next` - call the next eligible ticket
//! - `POST /api/counters/:id/verify` - hash-match the citizen, start serving
//! - `POST /api/counters/:id/complete` - finish service, free the counter
//! - `POST /api/counters/:id/assign-ticket` - manually assign a ticket
//! - `POST /api/counters/assign-next` - oldest waiting ticket to the next
//!   free counter (no category check; see the engine docs)

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wereda_core::engine::{CallOutcome, CounterSpec, CounterUpdate};
use wereda_core::types::{Counter, CounterId, ServiceCategory, TicketStatus};
use wereda_core::TicketCode;

/// Request to provision a counter.
#[derive(Debug, Deserialize)]
pub struct CreateCounterRequest {
    /// Operator-visible counter number; must be unique.
    pub counter_number: u32,
    /// Display name.
    pub counter_name: String,
    /// Categories the counter can serve.
    pub service_categories: Vec<ServiceCategory>,
    /// Staff label.
    pub staff_name: Option<String>,
}

/// Operator update; omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateCounterRequest {
    /// Activate or deactivate the counter.
    pub is_active: Option<bool>,
    /// Replace the staff label.
    pub staff_name: Option<String>,
}

/// Counter record on the wire.
#[derive(Debug, Serialize)]
pub struct CounterResponse {
    /// Counter identifier.
    pub id: Uuid,
    /// Operator-visible number.
    pub counter_number: u32,
    /// Display name.
    pub counter_name: String,
    /// Categories the counter can serve.
    pub service_categories: Vec<ServiceCategory>,
    /// Whether the counter participates in assignment.
    pub is_active: bool,
    /// Sequence id of the currently held ticket, if any.
    pub current_ticket_id: Option<i64>,
    /// Staff label.
    pub staff_name: Option<String>,
}

impl From<Counter> for CounterResponse {
    fn from(counter: Counter) -> Self {
        Self {
            id: *counter.id.as_uuid(),
            counter_number: counter.number,
            counter_name: counter.name,
            service_categories: counter.categories,
            is_active: counter.active,
            current_ticket_id: counter.current_ticket.map(wereda_core::TicketId::value),
            staff_name: counter.staff_name,
        }
    }
}

/// Outcome of a call-next attempt.
#[derive(Debug, Serialize)]
pub struct CallNextResponse {
    /// Message for the operator.
    pub message: String,
    /// Called ticket code, absent when nothing was waiting.
    pub ticket_number: Option<String>,
    /// Counter that made the call.
    pub counter_number: u32,
    /// Citizen display name, absent when nothing was waiting.
    pub full_name: Option<String>,
}

/// Request to verify a citizen at the counter.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Called ticket code.
    pub ticket_number: String,
    /// Raw identifier presented by the citizen.
    pub id_number: String,
}

/// Response after a ticket transition at the counter.
#[derive(Debug, Serialize)]
pub struct CounterTransitionResponse {
    /// Message for the operator.
    pub message: String,
    /// Ticket code.
    pub ticket_number: String,
    /// Status after the transition.
    pub status: TicketStatus,
}

/// Ticket code presented via query string for completion.
#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    /// Ticket code to complete.
    pub ticket_number: String,
}

/// Request to manually assign a ticket to this counter.
#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    /// Waiting ticket code.
    pub ticket_number: String,
}

/// Response after an assignment.
#[derive(Debug, Serialize)]
pub struct AssignedResponse {
    /// Message for the operator.
    pub message: String,
    /// Assigned ticket code.
    pub ticket_number: String,
    /// Counter the ticket went to.
    pub counter_number: Option<u32>,
}

/// `POST /api/counters` - provision a counter.
pub async fn create_counter(
    State(state): State<AppState>,
    Json(request): Json<CreateCounterRequest>,
) -> Result<(StatusCode, Json<CounterResponse>), AppError> {
    let counter = state
        .engine
        .create_counter(CounterSpec {
            number: request.counter_number,
            name: request.counter_name,
            categories: request.service_categories,
            staff_name: request.staff_name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(counter.into())))
}

/// `GET /api/counters` - list all counters.
pub async fn list_counters(
    State(state): State<AppState>,
) -> Result<Json<Vec<CounterResponse>>, AppError> {
    let counters = state.engine.list_counters().await?;
    Ok(Json(counters.into_iter().map(CounterResponse::from).collect()))
}

/// `PUT /api/counters/:id` - operator update.
pub async fn update_counter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCounterRequest>,
) -> Result<Json<CounterResponse>, AppError> {
    let counter = state
        .engine
        .update_counter(
            CounterId::from_uuid(id),
            CounterUpdate {
                active: request.is_active,
                staff_name: request.staff_name,
            },
        )
        .await?;
    Ok(Json(counter.into()))
}

/// `POST /api/counters/:id/call-next` - call the next eligible ticket.
pub async fn call_next(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CallNextResponse>, AppError> {
    match state.engine.call_next(CounterId::from_uuid(id)).await? {
        CallOutcome::Called(ticket) => Ok(Json(CallNextResponse {
            message: "Ticket called".to_string(),
            counter_number: ticket.counter_number.unwrap_or_default(),
            ticket_number: Some(ticket.code.as_str().to_string()),
            full_name: Some(ticket.full_name),
        })),
        CallOutcome::NothingWaiting { counter_number } => Ok(Json(CallNextResponse {
            message: "No tickets waiting".to_string(),
            ticket_number: None,
            counter_number,
            full_name: None,
        })),
    }
}

/// `POST /api/counters/:id/verify` - hash-match the citizen and start
/// serving.
pub async fn verify_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<CounterTransitionResponse>, AppError> {
    let ticket = state
        .engine
        .verify_at_counter(
            CounterId::from_uuid(id),
            &TicketCode::new(request.ticket_number),
            &request.id_number,
        )
        .await?;
    Ok(Json(CounterTransitionResponse {
        message: "Verification successful".to_string(),
        ticket_number: ticket.code.as_str().to_string(),
        status: ticket.status,
    }))
}

/// `POST /api/counters/:id/complete` - finish service and free the counter.
pub async fn complete_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<CounterTransitionResponse>, AppError> {
    let ticket = state
        .engine
        .complete_service(
            CounterId::from_uuid(id),
            &TicketCode::new(query.ticket_number),
        )
        .await?;
    Ok(Json(CounterTransitionResponse {
        message: "Service completed".to_string(),
        ticket_number: ticket.code.as_str().to_string(),
        status: ticket.status,
    }))
}

/// `POST /api/counters/:id/assign-ticket` - manually assign a waiting
/// ticket to this counter.
pub async fn assign_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTicketRequest>,
) -> Result<Json<AssignedResponse>, AppError> {
    let ticket = state
        .engine
        .assign_ticket(
            CounterId::from_uuid(id),
            &TicketCode::new(request.ticket_number),
        )
        .await?;
    Ok(Json(AssignedResponse {
        message: "Ticket assigned".to_string(),
        ticket_number: ticket.code.as_str().to_string(),
        counter_number: ticket.counter_number,
    }))
}

/// `POST /api/counters/assign-next` - oldest waiting ticket to the next
/// free counter.
pub async fn assign_next(
    State(state): State<AppState>,
) -> Result<Json<AssignedResponse>, AppError> {
    let ticket = state.engine.assign_next(None).await?;
    Ok(Json(AssignedResponse {
        message: "Ticket assigned".to_string(),
        ticket_number: ticket.code.as_str().to_string(),
        counter_number: ticket.counter_number,
    }))
}

//! Error types for web handlers.
//!
//! [`AppError`] bridges the engine's error taxonomy and HTTP responses,
//! implementing Axum's `IntoResponse`. Every [`QueueError`] category has a
//! fixed status mapping; store faults surface as an opaque 500 with the
//! detail going to `tracing` only.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use wereda_core::QueueError;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code.
    status: StatusCode,
    /// Error message (user-facing).
    message: String,
    /// Error code (for client error handling).
    code: String,
    /// Internal error (for logging, not exposed to the client).
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            message.into(),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 429 Too Many Requests error.
    #[must_use]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            message.into(),
            "TOO_MANY_REQUESTS".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<QueueError> for AppError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Validation(message) => Self::validation(message),
            QueueError::DuplicateActiveTicket { existing } => Self::bad_request(format!(
                "You already have an active ticket: {existing}. Please wait to be served."
            )),
            QueueError::Blacklisted { reason } => Self::forbidden(reason.map_or_else(
                || "Access denied".to_string(),
                |reason| format!("Access denied. Reason: {reason}"),
            )),
            QueueError::SuspiciousActivity => Self::too_many_requests(
                "Too many ticket requests. Please contact administration.",
            ),
            QueueError::IdentityMismatch => {
                Self::forbidden("ID does not match ticket. Verification failed.")
            }
            QueueError::TicketNotFound(_) => Self::not_found("Ticket not found"),
            QueueError::CounterNotFound(_) => Self::not_found("Counter not found"),
            QueueError::NoActiveTickets => Self::not_found("No active tickets found for this ID"),
            QueueError::CitizenNotFound => Self::not_found("Citizen not found"),
            QueueError::CounterInactive(_) => Self::bad_request("Counter is not active"),
            QueueError::CounterOccupied(number) => {
                Self::bad_request(format!("Counter {number} is already serving a ticket"))
            }
            QueueError::DuplicateCounterNumber(_) => {
                Self::bad_request("Counter number already exists")
            }
            QueueError::InvalidTransition { code, from, to } => {
                Self::bad_request(format!("Ticket {code} cannot move from {from} to {to}"))
            }
            QueueError::NoCountersConfigured => Self::not_found("No counters configured"),
            QueueError::NoWaitingTickets => Self::not_found("No waiting tickets to assign"),
            QueueError::AllCountersBusy => Self::bad_request("All counters are currently busy"),
            QueueError::Store(store_error) => {
                Self::internal("Internal server error").with_source(anyhow::Error::new(store_error))
            }
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wereda_core::TicketCode;
    use wereda_core::types::TicketStatus;

    fn status_of(error: QueueError) -> StatusCode {
        AppError::from(error).status
    }

    #[test]
    fn queue_errors_map_to_documented_statuses() {
        assert_eq!(
            status_of(QueueError::DuplicateActiveTicket {
                existing: TicketCode::new("IM-001")
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(QueueError::Blacklisted { reason: None }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(QueueError::SuspiciousActivity),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(QueueError::IdentityMismatch),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(QueueError::TicketNotFound(TicketCode::new("IM-404"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(QueueError::AllCountersBusy),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(QueueError::NoWaitingTickets),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(QueueError::InvalidTransition {
                code: TicketCode::new("IM-001"),
                from: TicketStatus::Completed,
                to: TicketStatus::Cancelled,
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn duplicate_active_rejection_names_the_existing_ticket() {
        let error = AppError::from(QueueError::DuplicateActiveTicket {
            existing: TicketCode::new("IM-007"),
        });
        assert!(error.message.contains("IM-007"));
    }
}

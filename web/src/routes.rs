//! Router configuration for the queue server.
//!
//! Builds the complete Axum router with all endpoints.

use crate::api::{citizens, counters, display, health, statistics, tickets};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Static path segments (`cancel-by-id`, `active`, `assign-next`) are
/// matched before the `:code`/`:id` captures on the same prefixes.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Kiosk
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets/cancel-by-id", delete(tickets::cancel_all_by_identity))
        .route("/tickets/active/:id_number", get(tickets::active_tickets))
        .route("/tickets/:code", get(tickets::ticket_status))
        .route("/tickets/:code/cancel", delete(tickets::cancel_ticket))
        .route("/tickets/:code/expire", post(tickets::force_expire))
        .route(
            "/tickets/:code/assign-next",
            post(tickets::assign_to_next_counter),
        )
        // Counters
        .route("/counters", post(counters::create_counter))
        .route("/counters", get(counters::list_counters))
        .route("/counters/assign-next", post(counters::assign_next))
        .route("/counters/:id", put(counters::update_counter))
        .route("/counters/:id/call-next", post(counters::call_next))
        .route("/counters/:id/verify", post(counters::verify_ticket))
        .route("/counters/:id/complete", post(counters::complete_service))
        .route("/counters/:id/assign-ticket", post(counters::assign_ticket))
        // Admin
        .route("/citizens/blacklist", post(citizens::set_blacklist))
        // Display
        .route("/display/queue-status", get(display::queue_status))
        .route("/display/waiting-tickets", get(display::waiting_tickets))
        // Reporting
        .route("/statistics", get(statistics::statistics));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! HTTP API tests over the full router, backed by the in-memory store.
//!
//! Walks the kiosk → counter → display flow end to end and pins the error
//! status mapping the clients depend on.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;
use wereda_core::environment::SystemClock;
use wereda_core::{EngineConfig, QueueEngine};
use wereda_testing::MemoryQueueStore;
use wereda_web::{AppState, build_router};

fn test_server() -> TestServer {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = Arc::new(QueueEngine::new(
        store,
        Arc::new(SystemClock),
        EngineConfig::default(),
    ));
    TestServer::new(build_router(AppState::new(engine))).expect("router should start")
}

async fn create_ticket(server: &TestServer, id_number: &str, category: &str) -> Value {
    let response = server
        .post("/api/tickets")
        .json(&json!({
            "id_number": id_number,
            "full_name": "Tesfaye Bekele",
            "service_category": category,
            "phone_number": "+251911234567",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

async fn create_counter(server: &TestServer, number: u32, categories: &[&str]) -> String {
    let response = server
        .post("/api/counters")
        .json(&json!({
            "counter_number": number,
            "counter_name": format!("Counter {number}"),
            "service_categories": categories,
            "staff_name": "Almaz",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body = response.json::<Value>();
    body["id"].as_str().expect("counter id").to_string()
}

#[tokio::test]
async fn health_endpoint_answers() {
    let server = test_server();
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn kiosk_counter_display_flow() {
    let server = test_server();

    // Kiosk: first immigration ticket.
    let ticket = create_ticket(&server, "ABC123456", "immigration").await;
    assert_eq!(ticket["ticket_number"], "IM-001");
    assert_eq!(ticket["queue_position"], 1);
    assert_eq!(ticket["estimated_wait_minutes"], 5);
    assert_eq!(ticket["status"], "waiting");

    // Status read.
    let status = server.get("/api/tickets/IM-001").await;
    assert_eq!(status.status_code(), StatusCode::OK);
    assert_eq!(status.json::<Value>()["status"], "waiting");

    // Counter provisioning and call-next.
    let counter_id = create_counter(&server, 1, &["immigration"]).await;
    let call = server
        .post(&format!("/api/counters/{counter_id}/call-next"))
        .await;
    assert_eq!(call.status_code(), StatusCode::OK);
    let call_body = call.json::<Value>();
    assert_eq!(call_body["message"], "Ticket called");
    assert_eq!(call_body["ticket_number"], "IM-001");
    assert_eq!(call_body["counter_number"], 1);

    // Verification (hash match) moves the ticket to serving.
    let verify = server
        .post(&format!("/api/counters/{counter_id}/verify"))
        .json(&json!({ "ticket_number": "IM-001", "id_number": "ABC123456" }))
        .await;
    assert_eq!(verify.status_code(), StatusCode::OK);
    assert_eq!(verify.json::<Value>()["status"], "serving");

    // Completion frees the counter.
    let complete = server
        .post(&format!(
            "/api/counters/{counter_id}/complete?ticket_number=IM-001"
        ))
        .await;
    assert_eq!(complete.status_code(), StatusCode::OK);
    assert_eq!(complete.json::<Value>()["status"], "completed");

    // Display and statistics see the completion.
    let board = server.get("/api/display/queue-status").await;
    assert_eq!(board.status_code(), StatusCode::OK);
    let board_body = board.json::<Value>();
    assert_eq!(board_body["waiting_count"], 0);
    assert_eq!(board_body["total_served_today"], 1);

    let stats = server.get("/api/statistics").await;
    assert_eq!(stats.status_code(), StatusCode::OK);
    let stats_body = stats.json::<Value>();
    assert_eq!(stats_body["total_tickets_today"], 1);
    assert_eq!(stats_body["total_served_today"], 1);
}

#[tokio::test]
async fn duplicate_active_ticket_maps_to_400_naming_the_code() {
    let server = test_server();
    create_ticket(&server, "ABC123456", "immigration").await;

    let response = server
        .post("/api/tickets")
        .json(&json!({
            "id_number": "ABC123456",
            "full_name": "Tesfaye Bekele",
            "service_category": "tax_service",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(
        body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("IM-001")
    );
}

#[tokio::test]
async fn cancel_requires_the_matching_identity() {
    let server = test_server();
    create_ticket(&server, "ABC123456", "immigration").await;

    let forbidden = server
        .delete("/api/tickets/IM-001/cancel?id_number=WRONG-ID-99")
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

    let cancelled = server
        .delete("/api/tickets/IM-001/cancel?id_number=ABC123456")
        .await;
    assert_eq!(cancelled.status_code(), StatusCode::OK);
    assert_eq!(cancelled.json::<Value>()["status"], "cancelled");

    // Terminal now: a repeat cancel is a conflict-class 400.
    let repeat = server
        .delete("/api/tickets/IM-001/cancel?id_number=ABC123456")
        .await;
    assert_eq!(repeat.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_by_identity_cancels_everything_or_404s() {
    let server = test_server();

    let empty = server
        .delete("/api/tickets/cancel-by-id?id_number=ABC123456")
        .await;
    assert_eq!(empty.status_code(), StatusCode::NOT_FOUND);

    create_ticket(&server, "ABC123456", "immigration").await;
    let cancelled = server
        .delete("/api/tickets/cancel-by-id?id_number=ABC123456")
        .await;
    assert_eq!(cancelled.status_code(), StatusCode::OK);
    let body = cancelled.json::<Value>();
    assert_eq!(body["cancelled_tickets"], json!(["IM-001"]));
}

#[tokio::test]
async fn unknown_tickets_and_counters_are_404() {
    let server = test_server();

    assert_eq!(
        server.get("/api/tickets/IM-999").await.status_code(),
        StatusCode::NOT_FOUND
    );

    let missing_counter = uuid::Uuid::new_v4();
    assert_eq!(
        server
            .post(&format!("/api/counters/{missing_counter}/call-next"))
            .await
            .status_code(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn call_next_reports_nothing_waiting_as_success() {
    let server = test_server();
    let counter_id = create_counter(&server, 1, &["immigration"]).await;

    // A passport ticket exists but the counter only serves immigration.
    create_ticket(&server, "ABC123456", "passport_renewal").await;

    let response = server
        .post(&format!("/api/counters/{counter_id}/call-next"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["message"], "No tickets waiting");
    assert_eq!(body["ticket_number"], Value::Null);
}

#[tokio::test]
async fn assign_next_status_mapping() {
    let server = test_server();

    // No counters at all.
    assert_eq!(
        server.post("/api/counters/assign-next").await.status_code(),
        StatusCode::NOT_FOUND
    );

    create_counter(&server, 1, &["immigration"]).await;

    // Counters exist, nothing waiting.
    assert_eq!(
        server.post("/api/counters/assign-next").await.status_code(),
        StatusCode::NOT_FOUND
    );

    // One waiting ticket goes to counter 1 (category not checked here).
    create_ticket(&server, "ABC123456", "tax_service").await;
    let assigned = server.post("/api/counters/assign-next").await;
    assert_eq!(assigned.status_code(), StatusCode::OK);
    assert_eq!(assigned.json::<Value>()["counter_number"], 1);

    // Second ticket, no free counter left: all busy.
    create_ticket(&server, "DEF789012", "tax_service").await;
    assert_eq!(
        server.post("/api/counters/assign-next").await.status_code(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn verify_mismatch_is_403() {
    let server = test_server();
    create_ticket(&server, "ABC123456", "immigration").await;
    let counter_id = create_counter(&server, 1, &["immigration"]).await;
    server
        .post(&format!("/api/counters/{counter_id}/call-next"))
        .await;

    let response = server
        .post(&format!("/api/counters/{counter_id}/verify"))
        .json(&json!({ "ticket_number": "IM-001", "id_number": "NOT-THE-OWNER" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn active_ticket_listing_is_200_even_when_empty() {
    let server = test_server();

    let empty = server.get("/api/tickets/active/ABC123456").await;
    assert_eq!(empty.status_code(), StatusCode::OK);
    assert_eq!(empty.json::<Value>()["tickets"], json!([]));

    create_ticket(&server, "ABC123456", "immigration").await;
    let one = server.get("/api/tickets/active/ABC123456").await;
    let body = one.json::<Value>();
    assert_eq!(body["tickets"][0]["ticket_number"], "IM-001");
}

#[tokio::test]
async fn waiting_board_shows_truncated_identity_only() {
    let server = test_server();
    create_ticket(&server, "ABC123456", "immigration").await;

    let response = server.get("/api/display/waiting-tickets").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["total_waiting"], 1);
    let display = body["tickets"][0]["identity_display"]
        .as_str()
        .expect("identity display");
    assert!(display.ends_with("***"));
    assert!(!display.contains("ABC123456"));
}

#[tokio::test]
async fn blacklist_round_trip() {
    let server = test_server();

    // Citizen record appears with the first ticket; free the active slot.
    create_ticket(&server, "ABC123456", "immigration").await;
    server
        .delete("/api/tickets/IM-001/cancel?id_number=ABC123456")
        .await;

    // Digest of the raw id, as an admin would read it from audit tooling.
    let identity_hash = wereda_core::IdentityHash::from_raw("ABC123456");
    let blacklisted = server
        .post("/api/citizens/blacklist")
        .json(&json!({
            "identity_hash": identity_hash.as_str(),
            "blacklisted": true,
            "reason": "Repeated no-shows",
        }))
        .await;
    assert_eq!(blacklisted.status_code(), StatusCode::OK);

    let rejected = server
        .post("/api/tickets")
        .json(&json!({
            "id_number": "ABC123456",
            "full_name": "Tesfaye Bekele",
            "service_category": "immigration",
        }))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::FORBIDDEN);
}

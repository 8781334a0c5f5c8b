//! Tests for the read-side projections.
//!
//! Aggregates must reflect current committed state at read time, with
//! nothing cached between calls.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

use chrono::Duration;
use std::sync::Arc;
use wereda_core::engine::{CallOutcome, CounterSpec, TicketRequest};
use wereda_core::environment::Clock;
use wereda_core::store::QueueStore;
use wereda_core::{EngineConfig, QueueEngine, ServiceCategory, Ticket, TicketStatus};
use wereda_testing::{MemoryQueueStore, SteppingClock, test_clock};

fn request(raw_id: &str, full_name: &str, category: ServiceCategory) -> TicketRequest {
    TicketRequest {
        raw_id: raw_id.to_string(),
        full_name: full_name.to_string(),
        category,
        phone_number: None,
    }
}

fn called(outcome: CallOutcome) -> Ticket {
    match outcome {
        CallOutcome::Called(ticket) => ticket,
        CallOutcome::NothingWaiting { counter_number } => {
            panic!("expected a called ticket, counter {counter_number} found nothing")
        }
    }
}

/// Seed: one completed service (6-minute span), one called ticket, two
/// waiting tickets across categories, two active counters.
async fn seeded_engine() -> (Arc<MemoryQueueStore>, QueueEngine, Arc<SteppingClock>) {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(SteppingClock::new(test_clock().now()));
    let store_dyn: Arc<dyn QueueStore> = store.clone();
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let engine = QueueEngine::new(store_dyn, clock_dyn, EngineConfig::default());

    let counter_1 = engine
        .create_counter(CounterSpec {
            number: 1,
            name: "Counter 1".to_string(),
            categories: vec![ServiceCategory::Immigration],
            staff_name: Some("Almaz".to_string()),
        })
        .await
        .unwrap();
    let counter_2 = engine
        .create_counter(CounterSpec {
            number: 2,
            name: "Counter 2".to_string(),
            categories: vec![ServiceCategory::PassportRenewal],
            staff_name: None,
        })
        .await
        .unwrap();

    // Completed service with a 6-minute serving span.
    let first = engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    let ticket = called(engine.call_next(counter_1.id).await.unwrap());
    engine
        .verify_at_counter(counter_1.id, &ticket.code, "ETH-000001")
        .await
        .unwrap();
    clock.advance(Duration::minutes(6));
    engine
        .complete_service(counter_1.id, &first.ticket.code)
        .await
        .unwrap();

    // A called (not yet verified) passport ticket.
    engine
        .create_ticket(request(
            "ETH-000002",
            "Sara Tesfaye",
            ServiceCategory::PassportRenewal,
        ))
        .await
        .unwrap();
    called(engine.call_next(counter_2.id).await.unwrap());

    // Two tickets still waiting.
    engine
        .create_ticket(request("ETH-000003", "Hana Girma", ServiceCategory::Immigration))
        .await
        .unwrap();
    engine
        .create_ticket(request("ETH-000004", "Dawit Bekele", ServiceCategory::TaxService))
        .await
        .unwrap();

    (store, engine, clock)
}

#[tokio::test]
async fn queue_status_reflects_committed_state() {
    let (_store, engine, _clock) = seeded_engine().await;

    let status = engine.queue_status().await.unwrap();
    assert_eq!(status.now_serving.len(), 1);
    assert_eq!(status.now_serving[0].counter_number, Some(2));
    assert_eq!(status.now_serving[0].status, TicketStatus::Called);
    assert_eq!(status.waiting_count, 2);
    assert_eq!(status.total_served_today, 1);
    assert_eq!(status.average_wait_minutes, Some(6.0));
}

#[tokio::test]
async fn statistics_cover_the_day_buckets() {
    let (_store, engine, _clock) = seeded_engine().await;

    let stats = engine.statistics().await.unwrap();
    assert_eq!(stats.total_tickets_today, 4);
    assert_eq!(stats.total_served_today, 1);
    assert_eq!(stats.total_waiting, 2);
    assert_eq!(stats.total_expired_today, 0);
    assert_eq!(stats.active_counters, 2);
    assert!((stats.average_service_time_minutes - 6.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn statistics_track_expiry_and_deactivation_as_they_happen() {
    let (_store, engine, _clock) = seeded_engine().await;

    // Expire one waiting ticket and deactivate one counter, then re-read.
    let waiting = engine.waiting_tickets().await.unwrap();
    engine
        .force_expire(&waiting[0].ticket_number)
        .await
        .unwrap();
    let counters = engine.list_counters().await.unwrap();
    engine
        .update_counter(
            counters[0].id,
            wereda_core::engine::CounterUpdate {
                active: Some(false),
                staff_name: None,
            },
        )
        .await
        .unwrap();

    let stats = engine.statistics().await.unwrap();
    assert_eq!(stats.total_expired_today, 1);
    assert_eq!(stats.total_waiting, 1);
    assert_eq!(stats.active_counters, 1);
}

#[tokio::test]
async fn waiting_list_orders_by_creation_and_truncates_identity() {
    let (_store, engine, _clock) = seeded_engine().await;

    let waiting = engine.waiting_tickets().await.unwrap();
    assert_eq!(waiting.len(), 2);
    assert_eq!(waiting[0].position, 1);
    assert_eq!(waiting[1].position, 2);
    // FIFO: the immigration ticket was created before the tax one.
    assert_eq!(waiting[0].service, "Immigration Services");
    assert_eq!(waiting[1].service, "Tax Services");

    for entry in &waiting {
        assert!(entry.identity_display.ends_with("***"));
        assert_eq!(entry.identity_display.len(), 11);
        assert_eq!(entry.status, TicketStatus::Waiting);
    }
}

#[tokio::test]
async fn waiting_list_drops_tickets_past_their_deadline() {
    let (_store, engine, clock) = seeded_engine().await;

    clock.advance(Duration::hours(3));
    let waiting = engine.waiting_tickets().await.unwrap();
    assert!(waiting.is_empty());
}

//! Scenario tests for the counter assignment engine.
//!
//! Covers FIFO call-next with category restriction, the deliberately
//! category-blind assign-to-next-free-counter flow, verification at the
//! counter, completion, and the counter held-ticket invariant across every
//! exit path.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

use chrono::Duration;
use std::sync::Arc;
use wereda_core::engine::{CallOutcome, CounterSpec, CounterUpdate, TicketRequest};
use wereda_core::environment::Clock;
use wereda_core::store::QueueStore;
use wereda_core::types::{Counter, CounterId};
use wereda_core::{
    AuditAction, EngineConfig, QueueEngine, QueueError, ServiceCategory, Ticket, TicketStatus,
};
use wereda_testing::{MemoryQueueStore, SteppingClock, test_clock};

fn engine_on(store: &Arc<MemoryQueueStore>, clock: Arc<dyn Clock>) -> QueueEngine {
    let store: Arc<dyn QueueStore> = store.clone();
    QueueEngine::new(store, clock, EngineConfig::default())
}

fn request(raw_id: &str, full_name: &str, category: ServiceCategory) -> TicketRequest {
    TicketRequest {
        raw_id: raw_id.to_string(),
        full_name: full_name.to_string(),
        category,
        phone_number: None,
    }
}

async fn provision(
    engine: &QueueEngine,
    number: u32,
    categories: Vec<ServiceCategory>,
) -> Counter {
    engine
        .create_counter(CounterSpec {
            number,
            name: format!("Counter {number}"),
            categories,
            staff_name: None,
        })
        .await
        .expect("counter provisioning should succeed")
}

fn called(outcome: CallOutcome) -> Ticket {
    match outcome {
        CallOutcome::Called(ticket) => ticket,
        CallOutcome::NothingWaiting { counter_number } => {
            panic!("expected a called ticket, counter {counter_number} found nothing")
        }
    }
}

#[tokio::test]
async fn call_next_claims_the_oldest_eligible_ticket() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    engine
        .create_ticket(request("ETH-000002", "Sara Tesfaye", ServiceCategory::Immigration))
        .await
        .unwrap();

    let ticket = called(engine.call_next(counter.id).await.unwrap());
    assert_eq!(ticket.code.as_str(), "IM-001");
    assert_eq!(ticket.status, TicketStatus::Called);
    assert_eq!(ticket.counter_number, Some(1));
    assert!(ticket.called_at.is_some());

    let held = store.counter(counter.id).await.unwrap();
    assert_eq!(held.current_ticket, Some(ticket.id));

    let audit = store.audit_log().await;
    assert!(audit.iter().any(|e| e.action == AuditAction::TicketCalled));
}

#[tokio::test]
async fn call_next_ignores_tickets_outside_the_counters_categories() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    engine
        .create_ticket(request(
            "ETH-000001",
            "Abebe Alemu",
            ServiceCategory::PassportRenewal,
        ))
        .await
        .unwrap();

    match engine.call_next(counter.id).await.unwrap() {
        CallOutcome::NothingWaiting { counter_number } => assert_eq!(counter_number, 1),
        CallOutcome::Called(ticket) => panic!("unexpected call of {}", ticket.code),
    }
}

#[tokio::test]
async fn call_next_never_claims_a_ticket_past_its_deadline() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(SteppingClock::new(test_clock().now()));
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let engine = engine_on(&store, clock_dyn);
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    let details = engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    clock.advance(Duration::hours(3));

    // No sweep has run; the stored status is still waiting, yet the claim
    // must not see it.
    match engine.call_next(counter.id).await.unwrap() {
        CallOutcome::NothingWaiting { .. } => {}
        CallOutcome::Called(ticket) => panic!("claimed expired ticket {}", ticket.code),
    }
    let stored = store.ticket(&details.ticket.code).await.unwrap();
    assert_eq!(stored.status, TicketStatus::Waiting);
}

#[tokio::test]
async fn call_next_validates_the_counter() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));

    assert!(matches!(
        engine.call_next(CounterId::new()).await,
        Err(QueueError::CounterNotFound(_))
    ));

    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;
    engine
        .update_counter(
            counter.id,
            CounterUpdate {
                active: Some(false),
                staff_name: None,
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        engine.call_next(counter.id).await,
        Err(QueueError::CounterInactive(1))
    ));
}

#[tokio::test]
async fn an_occupied_counter_cannot_call_again_until_released() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    engine
        .create_ticket(request("ETH-000002", "Sara Tesfaye", ServiceCategory::Immigration))
        .await
        .unwrap();

    let first = called(engine.call_next(counter.id).await.unwrap());
    assert!(matches!(
        engine.call_next(counter.id).await,
        Err(QueueError::CounterOccupied(1))
    ));

    // Completing the held ticket frees the counter for the next call.
    engine
        .verify_at_counter(counter.id, &first.code, "ETH-000001")
        .await
        .unwrap();
    engine.complete_service(counter.id, &first.code).await.unwrap();

    let second = called(engine.call_next(counter.id).await.unwrap());
    assert_eq!(second.code.as_str(), "IM-002");
}

#[tokio::test]
async fn verification_hash_match_gates_the_serving_transition() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    let details = engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    let ticket = called(engine.call_next(counter.id).await.unwrap());

    // Wrong identity: forbidden, audited suspicious, ticket untouched.
    let error = engine
        .verify_at_counter(counter.id, &ticket.code, "SOMEBODY-ELSE")
        .await
        .expect_err("mismatch must be refused");
    assert!(matches!(error, QueueError::IdentityMismatch));
    let stored = store.ticket(&details.ticket.code).await.unwrap();
    assert_eq!(stored.status, TicketStatus::Called);
    let audit = store.audit_log().await;
    let failure = audit
        .iter()
        .find(|e| e.action == AuditAction::VerificationFailed)
        .expect("failed verification must be audited");
    assert!(failure.suspicious);

    // Correct identity: called -> serving.
    let serving = engine
        .verify_at_counter(counter.id, &ticket.code, "ETH-000001")
        .await
        .unwrap();
    assert_eq!(serving.status, TicketStatus::Serving);
    assert!(serving.served_at.is_some());
}

#[tokio::test]
async fn verification_requires_a_called_ticket() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    let details = engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();

    let error = engine
        .verify_at_counter(counter.id, &details.ticket.code, "ETH-000001")
        .await
        .expect_err("waiting tickets cannot be verified");
    assert!(matches!(error, QueueError::InvalidTransition { .. }));
}

#[tokio::test]
async fn completion_requires_serving_and_frees_the_counter() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    let details = engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    let ticket = called(engine.call_next(counter.id).await.unwrap());

    // Called but not verified: completion is a conflict.
    let error = engine
        .complete_service(counter.id, &ticket.code)
        .await
        .expect_err("completion requires serving");
    assert!(matches!(error, QueueError::InvalidTransition { .. }));

    engine
        .verify_at_counter(counter.id, &ticket.code, "ETH-000001")
        .await
        .unwrap();
    let completed = engine
        .complete_service(counter.id, &ticket.code)
        .await
        .unwrap();
    assert_eq!(completed.status, TicketStatus::Completed);
    assert!(completed.completed_at.is_some());

    let freed = store.counter(counter.id).await.unwrap();
    assert_eq!(freed.current_ticket, None);

    let stored = store.ticket(&details.ticket.code).await.unwrap();
    assert_eq!(stored.status, TicketStatus::Completed);

    let audit = store.audit_log().await;
    assert!(
        audit
            .iter()
            .any(|e| e.action == AuditAction::ServiceCompleted)
    );
}

#[tokio::test]
async fn cancelling_a_called_ticket_releases_the_counter() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    let ticket = called(engine.call_next(counter.id).await.unwrap());

    engine.cancel_ticket(&ticket.code, "ETH-000001").await.unwrap();

    let freed = store.counter(counter.id).await.unwrap();
    assert_eq!(freed.current_ticket, None);

    // The freed counter can claim again immediately.
    engine
        .create_ticket(request("ETH-000002", "Sara Tesfaye", ServiceCategory::Immigration))
        .await
        .unwrap();
    let next = called(engine.call_next(counter.id).await.unwrap());
    assert_eq!(next.code.as_str(), "IM-002");
}

#[tokio::test]
async fn force_expiring_a_called_ticket_releases_the_counter() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    let ticket = called(engine.call_next(counter.id).await.unwrap());

    engine.force_expire(&ticket.code).await.unwrap();
    let freed = store.counter(counter.id).await.unwrap();
    assert_eq!(freed.current_ticket, None);
}

#[tokio::test]
async fn assign_next_takes_the_lowest_numbered_free_counter() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    provision(&engine, 2, vec![ServiceCategory::Immigration]).await;
    provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();

    let assigned = engine.assign_next(None).await.unwrap();
    assert_eq!(assigned.counter_number, Some(1));
    assert_eq!(assigned.status, TicketStatus::Called);

    // Nothing left to assign.
    assert!(matches!(
        engine.assign_next(None).await,
        Err(QueueError::NoWaitingTickets)
    ));
}

#[tokio::test]
async fn assign_next_distinguishes_no_counters_no_tickets_and_all_busy() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));

    assert!(matches!(
        engine.assign_next(None).await,
        Err(QueueError::NoCountersConfigured)
    ));

    provision(&engine, 1, vec![ServiceCategory::Immigration]).await;
    assert!(matches!(
        engine.assign_next(None).await,
        Err(QueueError::NoWaitingTickets)
    ));

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    engine.assign_next(None).await.unwrap();

    engine
        .create_ticket(request("ETH-000002", "Sara Tesfaye", ServiceCategory::Immigration))
        .await
        .unwrap();
    assert!(matches!(
        engine.assign_next(None).await,
        Err(QueueError::AllCountersBusy)
    ));
}

#[tokio::test]
async fn assign_next_ignores_service_categories() {
    // Deliberate asymmetry against call-next: the auto-assignment flow does
    // not check category compatibility. This test pins the behavior.
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::TaxService]).await;

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();

    let assigned = engine.assign_next(None).await.unwrap();
    assert_eq!(assigned.counter_number, Some(counter.number));
    assert_eq!(assigned.category, ServiceCategory::Immigration);
}

#[tokio::test]
async fn a_specific_ticket_can_be_sent_to_the_next_free_counter() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    let second = engine
        .create_ticket(request("ETH-000002", "Sara Tesfaye", ServiceCategory::Immigration))
        .await
        .unwrap();

    // The younger ticket jumps the line when addressed explicitly.
    let assigned = engine.assign_next(Some(&second.ticket.code)).await.unwrap();
    assert_eq!(assigned.code.as_str(), "IM-002");
    assert_eq!(assigned.counter_number, Some(1));
}

#[tokio::test]
async fn manual_assignment_requires_a_waiting_ticket_and_a_free_counter() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    let counter = provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    let details = engine
        .create_ticket(request("ETH-000001", "Abebe Alemu", ServiceCategory::Immigration))
        .await
        .unwrap();
    let assigned = engine
        .assign_ticket(counter.id, &details.ticket.code)
        .await
        .unwrap();
    assert_eq!(assigned.status, TicketStatus::Called);

    // Already called: not waiting any more.
    let error = engine
        .assign_ticket(counter.id, &details.ticket.code)
        .await
        .expect_err("called tickets cannot be assigned again");
    assert!(matches!(
        error,
        QueueError::InvalidTransition { .. } | QueueError::CounterOccupied(_)
    ));
}

#[tokio::test]
async fn duplicate_counter_numbers_are_rejected() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    provision(&engine, 1, vec![ServiceCategory::Immigration]).await;

    let error = engine
        .create_counter(CounterSpec {
            number: 1,
            name: "Counter 1 again".to_string(),
            categories: vec![ServiceCategory::TaxService],
            staff_name: None,
        })
        .await
        .expect_err("duplicate number must be rejected");
    assert!(matches!(error, QueueError::DuplicateCounterNumber(1)));
}

#[tokio::test]
async fn counters_list_in_number_order() {
    let store = Arc::new(MemoryQueueStore::new());
    let engine = engine_on(&store, Arc::new(test_clock()));
    provision(&engine, 3, vec![ServiceCategory::Other]).await;
    provision(&engine, 1, vec![ServiceCategory::Other]).await;
    provision(&engine, 2, vec![ServiceCategory::Other]).await;

    let numbers: Vec<u32> = engine
        .list_counters()
        .await
        .unwrap()
        .into_iter()
        .map(|counter| counter.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

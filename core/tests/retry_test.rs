//! Transient persistence failures are retried; business failures are not.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use cinema_core::engine::ReservationEngine;
use cinema_core::memory::InMemoryStore;
use cinema_core::retry::RetryPolicy;
use cinema_core::store::{ScreeningInventory, TicketLedger};
use cinema_core::BookingError;
use cinema_testing::helpers::{FlakyStore, customer, single_screening};
use cinema_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

fn fast_retries(max_retries: usize) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_retries(max_retries)
        .with_initial_delay(Duration::from_millis(1))
}

async fn flaky(failures: u32) -> (Arc<FlakyStore<InMemoryStore>>, cinema_core::ScreeningId) {
    let inner = InMemoryStore::new();
    let screening = single_screening(&inner, 10).await;
    (Arc::new(FlakyStore::new(inner, failures)), screening.id)
}

#[tokio::test]
async fn purchase_succeeds_after_transient_failures() {
    let (store, screening_id) = flaky(2).await;
    let engine = ReservationEngine::new(Arc::clone(&store))
        .with_clock(Arc::new(test_clock()))
        .with_retry_policy(fast_retries(3));

    let tickets = engine.purchase(screening_id, &customer(1), 2).await.unwrap();

    assert_eq!(tickets.len(), 2);
    assert_eq!(store.attempts(), 3);
    assert_eq!(store.get_availability(screening_id).await.unwrap().available_seats, 8);
}

#[tokio::test]
async fn exhausted_retries_surface_persistence_and_change_nothing() {
    let (store, screening_id) = flaky(5).await;
    let engine = ReservationEngine::new(Arc::clone(&store)).with_retry_policy(fast_retries(2));

    let err = engine.purchase(screening_id, &customer(1), 1).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(store.attempts(), 3);
    assert_eq!(store.get_availability(screening_id).await.unwrap().available_seats, 10);
    assert!(store.inner().list_by_screening(screening_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn insufficient_seats_is_not_retried() {
    let (store, screening_id) = flaky(0).await;
    let engine = ReservationEngine::new(Arc::clone(&store)).with_retry_policy(fast_retries(3));

    let err = engine.purchase(screening_id, &customer(1), 11).await.unwrap_err();

    assert!(matches!(err, BookingError::InsufficientSeats { .. }));
    assert_eq!(store.attempts(), 1);
}

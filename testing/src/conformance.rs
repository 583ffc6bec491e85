//! Behavior every [`BookingStore`] must exhibit.
//!
//! Each check takes a freshly created, empty store. Backend test suites call
//! these from their own `#[tokio::test]` functions so the in-memory and the
//! SQLite backends are held to the same contract.

#![allow(clippy::expect_used, clippy::panic, clippy::missing_panics_doc)]

use crate::helpers::{
    FIXTURE_PRICE, assert_screening_invariants, customer, issued_seats, screening_for,
    single_screening,
};
use crate::mocks::{SteppingClock, test_clock};
use chrono::Duration;
use cinema_core::engine::ReservationEngine;
use cinema_core::environment::Clock;
use cinema_core::query::QueryLayer;
use cinema_core::retry::RetryPolicy;
use cinema_core::store::{BookingStore, CatalogSeeder, ScreeningInventory, TicketLedger};
use cinema_core::{BookingError, NewMovie, SeatNumber};
use std::collections::BTreeSet;
use std::sync::Arc;

fn engine<S: BookingStore>(store: &Arc<S>) -> ReservationEngine<S> {
    ReservationEngine::new(Arc::clone(store))
        .with_clock(Arc::new(SteppingClock::new(test_clock().now(), Duration::seconds(1))))
        .with_retry_policy(RetryPolicy::none())
}

/// Three seats from a full hall of 100 are 100, 99 and 98.
pub async fn purchase_counts_down_from_available<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder,
{
    let screening = single_screening(store.as_ref(), 100).await;

    let tickets = engine(&store)
        .purchase(screening.id, &customer(1), 3)
        .await
        .expect("purchase succeeds");

    let seats: Vec<_> = tickets.iter().map(|t| t.seat_number).collect();
    assert_eq!(seats, vec![SeatNumber::new(100), SeatNumber::new(99), SeatNumber::new(98)]);
    assert!(tickets.iter().all(|t| t.total_price == FIXTURE_PRICE));
    let availability = store.get_availability(screening.id).await.expect("availability");
    assert_eq!(availability.available_seats, 97);
    assert_screening_invariants(store.as_ref(), screening.id).await;
}

/// Asking for more than remains changes nothing.
pub async fn insufficient_seats_is_all_or_nothing<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder,
{
    let screening = single_screening(store.as_ref(), 2).await;

    let err = engine(&store)
        .purchase(screening.id, &customer(1), 5)
        .await
        .expect_err("only 2 seats remain");

    assert_eq!(
        err,
        BookingError::InsufficientSeats { screening_id: screening.id, requested: 5, available: 2 }
    );
    let availability = store.get_availability(screening.id).await.expect("availability");
    assert_eq!(availability.available_seats, 2);
    assert!(store.list_by_screening(screening.id).await.expect("tickets").is_empty());
}

/// Sequential single-seat purchases continue the countdown.
pub async fn sequential_purchases_continue_countdown<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder,
{
    let screening = single_screening(store.as_ref(), 5).await;
    let engine = engine(&store);

    let first = engine.purchase(screening.id, &customer(1), 1).await.expect("first");
    let second = engine.purchase(screening.id, &customer(2), 1).await.expect("second");

    assert_eq!(first[0].seat_number, SeatNumber::new(5));
    assert_eq!(second[0].seat_number, SeatNumber::new(4));
    let availability = store.get_availability(screening.id).await.expect("availability");
    assert_eq!(availability.available_seats, 3);
}

/// History spans screenings and lists the latest purchase first.
pub async fn history_is_most_recent_first<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder,
{
    let movie = store
        .add_movie(NewMovie::new("Oppenheimer", "Drama", 180, 8.8))
        .await
        .expect("movie");
    let early = screening_for(store.as_ref(), movie.id, 2, 10).await;
    let late = screening_for(store.as_ref(), movie.id, 5, 10).await;
    let engine = engine(&store);
    let ann = customer(1);

    engine.purchase(late.id, &ann, 1).await.expect("first purchase");
    engine.purchase(early.id, &ann, 1).await.expect("second purchase");
    engine.purchase(early.id, &customer(2), 1).await.expect("other customer");

    let history = QueryLayer::new(Arc::clone(&store))
        .purchase_history(&ann.email)
        .await
        .expect("history");

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].ticket.screening_id, early.id);
    assert_eq!(history[1].ticket.screening_id, late.id);
    assert!(history[0].ticket.purchased_at > history[1].ticket.purchased_at);
    assert!(history.iter().all(|h| h.movie_title == "Oppenheimer"));
}

/// Movies whose screenings are all past or sold out are not offered.
pub async fn available_movies_excludes_past_and_sold_out<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder,
{
    let past = store.add_movie(NewMovie::new("Past", "Drama", 90, 6.0)).await.expect("movie");
    let sold = store.add_movie(NewMovie::new("Sold", "Drama", 90, 6.0)).await.expect("movie");
    let open = store.add_movie(NewMovie::new("Open", "Drama", 90, 6.0)).await.expect("movie");

    screening_for(store.as_ref(), past.id, -3, 10).await;
    let full = screening_for(store.as_ref(), sold.id, 3, 2).await;
    screening_for(store.as_ref(), sold.id, -1, 10).await;
    screening_for(store.as_ref(), open.id, 4, 10).await;
    engine(&store).purchase(full.id, &customer(1), 2).await.expect("sell out");

    let movies = QueryLayer::new(Arc::clone(&store))
        .available_movies(test_clock().now())
        .await
        .expect("movies");

    let ids: Vec<_> = movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![open.id]);
}

/// Unknown ids and zero seats are rejected without side effects.
pub async fn rejects_unknown_and_invalid_requests<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder,
{
    let screening = single_screening(store.as_ref(), 10).await;
    let engine = engine(&store);

    let missing = cinema_core::ScreeningId::new(screening.id.get() + 1000);
    assert_eq!(
        engine.purchase(missing, &customer(1), 1).await,
        Err(BookingError::ScreeningNotFound(missing))
    );
    assert!(matches!(
        engine.purchase(screening.id, &customer(1), 0).await,
        Err(BookingError::InvalidInput(_))
    ));
    assert!(store.list_by_screening(screening.id).await.expect("tickets").is_empty());
}

/// Concurrent purchases totalling exactly the capacity all succeed.
pub async fn concurrent_purchases_fill_exactly<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder + 'static,
{
    let screening = single_screening(store.as_ref(), 100).await;
    let screening_id = screening.id;
    let engine = engine(&store);

    let handles: Vec<_> = (0..50)
        .map(|n| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.purchase(screening_id, &customer(n), 2).await })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task completes").expect("every purchase fits");
    }

    let availability = store.get_availability(screening.id).await.expect("availability");
    assert_eq!(availability.available_seats, 0);
    assert_eq!(issued_seats(store.as_ref(), screening.id).await, (1..=100).collect::<BTreeSet<_>>());
    assert_screening_invariants(store.as_ref(), screening.id).await;
}

/// Oversubscribed concurrent purchases never oversell.
pub async fn concurrent_oversubscription_never_oversells<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder + 'static,
{
    let capacity = 30;
    let screening = single_screening(store.as_ref(), capacity).await;
    let screening_id = screening.id;
    let engine = engine(&store);

    let handles: Vec<_> = (0..40)
        .map(|n| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.purchase(screening_id, &customer(n), 1).await })
        })
        .collect();

    let mut sold = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(tickets) => sold += tickets.len(),
            Err(BookingError::InsufficientSeats { .. }) => rejected += 1,
            Err(other) => panic!("unexpected purchase error: {other}"),
        }
    }

    assert_eq!(sold, capacity as usize);
    assert_eq!(rejected, 10);
    assert_screening_invariants(store.as_ref(), screening.id).await;
}

/// Hall statistics agree with the ledger.
pub async fn hall_utilization_matches_tickets<S>(store: Arc<S>)
where
    S: BookingStore + CatalogSeeder,
{
    let a = single_screening(store.as_ref(), 40).await;
    let b = screening_for(store.as_ref(), a.movie_id, 6, 60).await;
    let engine = engine(&store);
    engine.purchase(a.id, &customer(1), 7).await.expect("purchase a");
    engine.purchase(b.id, &customer(2), 3).await.expect("purchase b");

    let halls = QueryLayer::new(Arc::clone(&store))
        .hall_utilization()
        .await
        .expect("utilization");

    assert_eq!(halls.len(), 1);
    assert_eq!(halls[0].total_seats, 100);
    assert_eq!(halls[0].sold_seats, 10);
}

//! # Cinema Testing
//!
//! Testing utilities shared by the cinema booking backends.
//!
//! This crate provides:
//! - Deterministic clocks
//! - Catalog fixtures and a store wrapper that injects persistence failures
//! - Invariant assertions over a screening and its tickets
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use cinema_core::memory::InMemoryStore;
//! use cinema_core::store::BookingStore;
//! use cinema_core::Customer;
//! use cinema_testing::helpers::{assert_screening_invariants, single_screening};
//! use cinema_testing::test_clock;
//! use cinema_core::environment::Clock;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let screening = single_screening(&store, 10).await;
//!
//! store
//!     .reserve_and_issue(screening.id, 4, &Customer::new("Ann", "ann@example.com"), test_clock().now())
//!     .await
//!     .unwrap();
//!
//! assert_screening_invariants(&store, screening.id).await;
//! # });
//! ```

use chrono::{DateTime, Utc};
use cinema_core::environment::Clock;

/// Deterministic clocks.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use cinema_testing::mocks::FixedClock;
    /// use cinema_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by a fixed step on every reading.
    ///
    /// Gives each purchase a distinct timestamp, which makes history
    /// ordering observable.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Clock whose first reading is `start`
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self
                .next
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Fixtures and invariant assertions.
pub mod helpers {
    use super::{Clock, DateTime, Utc};
    use cinema_core::store::{
        BookingStore, Catalog, CatalogSeeder, ScreeningInventory, TicketLedger,
    };
    use cinema_core::seating::Reservation;
    use cinema_core::{
        Availability, BookingError, Capacity, Customer, Money, Movie, MovieId, NewMovie,
        NewScreening, Result, Screening, ScreeningId, Ticket, TicketDraft,
    };
    use std::collections::{HashSet, BTreeSet};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Price used by fixture screenings.
    pub const FIXTURE_PRICE: Money = Money::from_minor(40_000);

    /// Add one movie and one screening two hours after [`crate::test_clock`].
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the fixture.
    #[allow(clippy::expect_used)]
    pub async fn single_screening<S>(store: &S, capacity: u32) -> Screening
    where
        S: CatalogSeeder,
    {
        let movie = store
            .add_movie(NewMovie::new("Barbie", "Comedy", 114, 7.5))
            .await
            .expect("fixture movie");
        screening_for(store, movie.id, 2, capacity).await
    }

    /// Add a screening of `movie_id` starting `hours_from_now` hours after
    /// [`crate::test_clock`], in hall 1.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the fixture.
    #[allow(clippy::expect_used)]
    pub async fn screening_for<S>(
        store: &S,
        movie_id: MovieId,
        hours_from_now: i64,
        capacity: u32,
    ) -> Screening
    where
        S: CatalogSeeder,
    {
        store
            .add_screening(NewScreening::new(
                movie_id,
                crate::test_clock().now() + chrono::Duration::hours(hours_from_now),
                1,
                FIXTURE_PRICE,
                Capacity::new(capacity),
            ))
            .await
            .expect("fixture screening")
    }

    /// Customer number `n`, with a unique email.
    #[must_use]
    pub fn customer(n: usize) -> Customer {
        Customer::new(format!("Customer {n}"), format!("customer{n}@example.com"))
    }

    /// Check the seat invariants of one screening against its tickets.
    ///
    /// - `0 <= available_seats <= capacity`
    /// - ticket count equals `capacity - available_seats`
    /// - seat numbers are pairwise distinct and within `1..=capacity`
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violated invariant.
    #[allow(clippy::expect_used)]
    pub async fn assert_screening_invariants<S>(store: &S, screening_id: ScreeningId)
    where
        S: ScreeningInventory + TicketLedger,
    {
        let screening = store
            .get_screening(screening_id)
            .await
            .expect("screening exists");
        let tickets = store
            .list_by_screening(screening_id)
            .await
            .expect("tickets readable");
        let capacity = screening.capacity.value();

        assert!(
            screening.available_seats <= capacity,
            "screening {screening_id}: {} available exceeds capacity {capacity}",
            screening.available_seats
        );
        assert_eq!(
            tickets.len(),
            screening.sold_seats() as usize,
            "screening {screening_id}: ticket count does not match sold seats"
        );

        let mut seats = HashSet::with_capacity(tickets.len());
        for ticket in &tickets {
            let seat = ticket.seat_number.value();
            assert!(
                (1..=capacity).contains(&seat),
                "screening {screening_id}: seat {seat} out of range"
            );
            assert!(
                seats.insert(seat),
                "screening {screening_id}: seat {seat} issued twice"
            );
        }
    }

    /// Seats issued for a screening, as a sorted set.
    ///
    /// # Panics
    ///
    /// Panics if the ledger cannot be read.
    #[allow(clippy::expect_used)]
    pub async fn issued_seats<S: TicketLedger>(store: &S, screening_id: ScreeningId) -> BTreeSet<u32> {
        store
            .list_by_screening(screening_id)
            .await
            .expect("tickets readable")
            .iter()
            .map(|t| t.seat_number.value())
            .collect()
    }

    /// Wraps a store and fails the first `failures` purchases with a
    /// persistence error before they reach the inner store.
    #[derive(Debug)]
    pub struct FlakyStore<S> {
        inner: S,
        remaining_failures: AtomicU32,
        attempts: AtomicU32,
    }

    impl<S> FlakyStore<S> {
        /// Fail the next `failures` purchases.
        pub const fn new(inner: S, failures: u32) -> Self {
            Self {
                inner,
                remaining_failures: AtomicU32::new(failures),
                attempts: AtomicU32::new(0),
            }
        }

        /// Purchase attempts seen so far, failed ones included.
        pub fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }

        /// The wrapped store.
        pub const fn inner(&self) -> &S {
            &self.inner
        }
    }

    impl<S: Catalog> Catalog for FlakyStore<S> {
        async fn list_movies(&self) -> Result<Vec<Movie>> {
            self.inner.list_movies().await
        }

        async fn get_movie(&self, id: MovieId) -> Result<Movie> {
            self.inner.get_movie(id).await
        }
    }

    impl<S: ScreeningInventory> ScreeningInventory for FlakyStore<S> {
        async fn get_screening(&self, id: ScreeningId) -> Result<Screening> {
            self.inner.get_screening(id).await
        }

        async fn get_availability(&self, id: ScreeningId) -> Result<Availability> {
            self.inner.get_availability(id).await
        }

        async fn reserve(&self, id: ScreeningId, seat_count: u32) -> Result<Reservation> {
            self.inner.reserve(id, seat_count).await
        }

        async fn list_by_movie(
            &self,
            movie_id: MovieId,
            after: DateTime<Utc>,
        ) -> Result<Vec<Screening>> {
            self.inner.list_by_movie(movie_id, after).await
        }

        async fn movies_with_future_screenings(
            &self,
            after: DateTime<Utc>,
        ) -> Result<HashSet<MovieId>> {
            self.inner.movies_with_future_screenings(after).await
        }

        async fn list_screenings(&self) -> Result<Vec<Screening>> {
            self.inner.list_screenings().await
        }
    }

    impl<S: TicketLedger> TicketLedger for FlakyStore<S> {
        async fn append(&self, draft: TicketDraft) -> Result<Ticket> {
            self.inner.append(draft).await
        }

        async fn list_by_customer_email(&self, email: &str) -> Result<Vec<Ticket>> {
            self.inner.list_by_customer_email(email).await
        }

        async fn list_by_screening(&self, id: ScreeningId) -> Result<Vec<Ticket>> {
            self.inner.list_by_screening(id).await
        }
    }

    impl<S: BookingStore> BookingStore for FlakyStore<S> {
        async fn reserve_and_issue(
            &self,
            id: ScreeningId,
            seat_count: u32,
            customer: &Customer,
            purchased_at: DateTime<Utc>,
        ) -> Result<Vec<Ticket>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let injected = self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Err(BookingError::Persistence("injected failure".to_string()));
            }
            self.inner
                .reserve_and_issue(id, seat_count, customer, purchased_at)
                .await
        }
    }
}

pub mod conformance;

/// Property-based testing strategies.
pub mod properties {
    use proptest::prelude::*;

    /// Seat counts for one purchase, occasionally larger than a small hall.
    pub fn seat_count() -> impl Strategy<Value = u32> {
        prop_oneof![
            8 => 1u32..=4,
            2 => 5u32..=30,
        ]
    }

    /// A sequence of purchase sizes.
    pub fn purchase_sizes(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(seat_count(), 1..=max_len)
    }

    /// Hall capacities worth exercising.
    pub fn capacity() -> impl Strategy<Value = u32> {
        1u32..=120
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, test_clock};

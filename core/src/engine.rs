//! Reservation engine: the write path for purchases.
//!
//! The engine validates a request, stamps it with the injected clock and
//! hands it to [`BookingStore::reserve_and_issue`], retrying transient
//! persistence failures. It owns no state of its own.

use crate::environment::{Clock, SystemClock};
use crate::error::{BookingError, Result};
use crate::retry::{RetryPolicy, retry_transient};
use crate::seating::ensure_seat_count;
use crate::store::BookingStore;
use crate::types::{Customer, ScreeningId, Ticket};
use std::sync::Arc;

/// Purchases seats against a [`BookingStore`].
pub struct ReservationEngine<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl<S> Clone for ReservationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            retry: self.retry.clone(),
        }
    }
}

impl<S: BookingStore> ReservationEngine<S> {
    /// Engine using the wall clock and the default retry policy.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the clock used for purchase timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the retry policy for persistence failures.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Buy `seat_count` seats for `customer`.
    ///
    /// Either every ticket is issued or none is, and a failure leaves the
    /// screening's counter untouched.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`] for a non-positive id or zero seats
    /// - [`BookingError::ScreeningNotFound`] for an unknown screening
    /// - [`BookingError::InsufficientSeats`] if too few seats remain
    /// - [`BookingError::Persistence`] once retries are exhausted
    #[tracing::instrument(
        skip(self, customer),
        fields(screening_id = %screening_id, email = %customer.email)
    )]
    pub async fn purchase(
        &self,
        screening_id: ScreeningId,
        customer: &Customer,
        seat_count: u32,
    ) -> Result<Vec<Ticket>> {
        let result = self.try_purchase(screening_id, customer, seat_count).await;

        match &result {
            Ok(tickets) => {
                metrics::counter!("cinema_purchases_total", "outcome" => "success").increment(1);
                metrics::counter!("cinema_seats_sold_total").increment(tickets.len() as u64);
                tracing::debug!(tickets = tickets.len(), "Purchase completed");
            }
            Err(err) => {
                metrics::counter!("cinema_purchases_total", "outcome" => err.code()).increment(1);
                tracing::warn!(error = %err, seat_count, "Purchase rejected");
            }
        }

        result
    }

    async fn try_purchase(
        &self,
        screening_id: ScreeningId,
        customer: &Customer,
        seat_count: u32,
    ) -> Result<Vec<Ticket>> {
        if screening_id.get() <= 0 {
            return Err(BookingError::InvalidInput(format!(
                "screening id must be positive, got {screening_id}"
            )));
        }
        ensure_seat_count(seat_count)?;

        retry_transient(&self.retry, || {
            let purchased_at = self.clock.now();
            self.store
                .reserve_and_issue(screening_id, seat_count, customer, purchased_at)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::store::{CatalogSeeder, ScreeningInventory, TicketLedger};
    use crate::types::{Capacity, Money, NewMovie, NewScreening, SeatNumber};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    async fn engine(capacity: u32) -> (ReservationEngine<InMemoryStore>, ScreeningId) {
        let store = Arc::new(InMemoryStore::new());
        let movie = store
            .add_movie(NewMovie::new("Barbie", "Comedy", 114, 7.5))
            .await
            .unwrap();
        let screening = store
            .add_screening(NewScreening::new(
                movie.id,
                epoch() + Duration::days(1),
                3,
                Money::from_minor(40_000),
                Capacity::new(capacity),
            ))
            .await
            .unwrap();
        let engine = ReservationEngine::new(store).with_clock(Arc::new(Frozen(epoch())));
        (engine, screening.id)
    }

    #[tokio::test]
    async fn purchase_stamps_clock_and_price() {
        let (engine, screening_id) = engine(100).await;
        let customer = Customer::new("Ann", "ann@example.com");

        let tickets = engine.purchase(screening_id, &customer, 2).await.unwrap();

        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.purchased_at == epoch()));
        assert!(tickets.iter().all(|t| t.total_price == Money::from_minor(40_000)));
        assert_eq!(tickets[0].seat_number, SeatNumber::new(100));
        assert_eq!(tickets[1].seat_number, SeatNumber::new(99));
    }

    #[tokio::test]
    async fn invalid_requests_never_touch_the_store() {
        let (engine, screening_id) = engine(5).await;
        let customer = Customer::new("Ann", "ann@example.com");

        let zero = engine.purchase(screening_id, &customer, 0).await;
        let negative = engine.purchase(ScreeningId::new(-1), &customer, 1).await;

        assert!(matches!(zero, Err(BookingError::InvalidInput(_))));
        assert!(matches!(negative, Err(BookingError::InvalidInput(_))));
        let store = engine.store();
        assert_eq!(store.get_availability(screening_id).await.unwrap().available_seats, 5);
        assert!(store.list_by_screening(screening_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insufficient_seats_issues_nothing() {
        let (engine, screening_id) = engine(3).await;
        let customer = Customer::new("Bob", "bob@example.com");

        let err = engine.purchase(screening_id, &customer, 4).await.unwrap_err();

        assert_eq!(
            err,
            BookingError::InsufficientSeats { screening_id, requested: 4, available: 3 }
        );
        assert!(engine.store().list_by_customer_email("bob@example.com").await.unwrap().is_empty());
    }
}

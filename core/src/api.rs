//! Calling contract for presentation layers.
//!
//! [`BookingService`] wires the engine and the query layer to one store and
//! one clock, and returns serializable summaries instead of domain entities.

use crate::engine::ReservationEngine;
use crate::environment::{Clock, SystemClock};
use crate::error::Result;
use crate::query::QueryLayer;
use crate::retry::RetryPolicy;
use crate::store::BookingStore;
use crate::types::{
    Customer, HallUtilization, HistoryEntry, Money, Movie, MovieId, Screening, ScreeningId,
    SeatNumber, Ticket, TicketId,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A movie that can currently be booked.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieSummary {
    /// Movie id
    pub id: MovieId,
    /// Title
    pub title: String,
    /// Genre
    pub genre: String,
    /// Running time in minutes
    pub duration_minutes: u32,
    /// Audience rating
    pub rating: f64,
}

impl From<Movie> for MovieSummary {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            genre: movie.genre,
            duration_minutes: movie.duration_minutes,
            rating: movie.rating,
        }
    }
}

/// A bookable screening.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScreeningSummary {
    /// Screening id
    pub id: ScreeningId,
    /// Start time, ISO-8601 in UTC
    pub start_time: String,
    /// Hall number
    pub hall_number: u32,
    /// Price per seat in minor units
    pub price: Money,
    /// Seats left
    pub available_seats: u32,
}

impl From<Screening> for ScreeningSummary {
    fn from(screening: Screening) -> Self {
        Self {
            id: screening.id,
            start_time: iso(screening.starts_at),
            hall_number: screening.hall_number,
            price: screening.price,
            available_seats: screening.available_seats,
        }
    }
}

/// Result of a purchase attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    /// Every requested seat was issued.
    Success {
        /// One ticket per seat
        tickets: Vec<Ticket>,
    },
    /// Nothing was issued.
    Failure {
        /// Human-readable cause
        reason: String,
        /// Whether repeating the same request may succeed
        retryable: bool,
    },
}

impl PurchaseOutcome {
    /// True for [`PurchaseOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One row of a customer's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    /// Ticket id
    pub ticket_id: TicketId,
    /// Movie title
    pub movie_title: String,
    /// Screening start, ISO-8601 in UTC
    pub start_time: String,
    /// Hall number
    pub hall_number: u32,
    /// Seat number
    pub seat_number: SeatNumber,
    /// Price paid in minor units
    pub total_price: Money,
    /// Purchase time, ISO-8601 in UTC
    pub purchase_time: String,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            ticket_id: entry.ticket.id,
            movie_title: entry.movie_title,
            start_time: iso(entry.screening_starts_at),
            hall_number: entry.hall_number,
            seat_number: entry.ticket.seat_number,
            total_price: entry.ticket.total_price,
            purchase_time: iso(entry.ticket.purchased_at),
        }
    }
}

/// Browse, buy and look up history against one backend.
///
/// # Example
///
/// ```
/// use cinema_core::api::{BookingService, PurchaseOutcome};
/// use cinema_core::memory::InMemoryStore;
/// use cinema_core::seed::{SampleCatalogOptions, seed_sample_catalog};
/// use chrono::Utc;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let store = Arc::new(InMemoryStore::new());
/// seed_sample_catalog(store.as_ref(), Utc::now(), &SampleCatalogOptions::default()).await?;
///
/// let service = BookingService::new(store);
/// let movies = service.list_available_movies().await?;
/// let screenings = service.list_screenings(movies[0].id).await?;
///
/// let outcome = service
///     .purchase(screenings[0].id, "Ann", "ann@example.com", 2)
///     .await;
/// assert!(outcome.is_success());
/// assert_eq!(service.get_history("ann@example.com").await?.len(), 2);
/// # Ok::<(), cinema_core::BookingError>(())
/// # }).unwrap();
/// ```
pub struct BookingService<S> {
    engine: ReservationEngine<S>,
    queries: QueryLayer<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for BookingService<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            queries: self.queries.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: BookingStore> BookingService<S> {
    /// Service using the wall clock and the default retry policy.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_environment(store, Arc::new(SystemClock), RetryPolicy::default())
    }

    /// Service with an explicit clock and retry policy.
    #[must_use]
    pub fn with_environment(store: Arc<S>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            engine: ReservationEngine::new(Arc::clone(&store))
                .with_clock(Arc::clone(&clock))
                .with_retry_policy(retry),
            queries: QueryLayer::new(store),
            clock,
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        self.engine.store()
    }

    /// Movies with a future screening that still has seats.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    pub async fn list_available_movies(&self) -> Result<Vec<MovieSummary>> {
        let movies = self.queries.available_movies(self.clock.now()).await?;
        Ok(movies.into_iter().map(MovieSummary::from).collect())
    }

    /// Future screenings of `movie_id` that still have seats.
    ///
    /// # Errors
    ///
    /// - [`crate::BookingError::InvalidInput`] for a non-positive id
    /// - [`crate::BookingError::MovieNotFound`] for an unknown movie
    /// - [`crate::BookingError::Persistence`] if the backend fails
    pub async fn list_screenings(&self, movie_id: MovieId) -> Result<Vec<ScreeningSummary>> {
        let screenings = self
            .queries
            .screenings_for_movie(movie_id, self.clock.now())
            .await?;
        Ok(screenings.into_iter().map(ScreeningSummary::from).collect())
    }

    /// Buy `seat_count` seats. Failures are reported in the outcome.
    pub async fn purchase(
        &self,
        screening_id: ScreeningId,
        customer_name: &str,
        customer_email: &str,
        seat_count: u32,
    ) -> PurchaseOutcome {
        let customer = Customer::new(customer_name, customer_email);
        match self.engine.purchase(screening_id, &customer, seat_count).await {
            Ok(tickets) => PurchaseOutcome::Success { tickets },
            Err(err) => PurchaseOutcome::Failure {
                reason: err.to_string(),
                retryable: err.is_retryable(),
            },
        }
    }

    /// Purchase history for `customer_email`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    pub async fn get_history(&self, customer_email: &str) -> Result<Vec<HistoryItem>> {
        let entries = self.queries.purchase_history(customer_email).await?;
        Ok(entries.into_iter().map(HistoryItem::from).collect())
    }

    /// Seat usage per hall.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    pub async fn hall_utilization(&self) -> Result<Vec<HallUtilization>> {
        self.queries.hall_utilization().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::store::CatalogSeeder;
    use crate::types::{Capacity, NewMovie, NewScreening};
    use chrono::{Duration, TimeZone};

    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    async fn service() -> (BookingService<InMemoryStore>, ScreeningId) {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let store = Arc::new(InMemoryStore::new());
        let movie = store
            .add_movie(NewMovie::new("Oppenheimer", "Drama", 180, 8.8))
            .await
            .unwrap();
        let screening = store
            .add_screening(NewScreening::new(
                movie.id,
                now + Duration::hours(1),
                2,
                Money::from_minor(45_000),
                Capacity::new(3),
            ))
            .await
            .unwrap();
        let service =
            BookingService::with_environment(store, Arc::new(Frozen(now)), RetryPolicy::none());
        (service, screening.id)
    }

    #[tokio::test]
    async fn screening_summary_uses_iso_start_time() {
        let (service, _) = service().await;
        let screenings = service.list_screenings(MovieId::new(1)).await.unwrap();
        assert_eq!(screenings[0].start_time, "2025-01-01T10:00:00Z");
        assert_eq!(screenings[0].available_seats, 3);
    }

    #[tokio::test]
    async fn failed_purchase_is_reported_not_raised() {
        let (service, screening_id) = service().await;

        let outcome = service.purchase(screening_id, "Ann", "ann@example.com", 4).await;

        let PurchaseOutcome::Failure { reason, retryable } = outcome else {
            unreachable!("only 3 seats exist");
        };
        assert!(reason.contains("Insufficient seats"));
        assert!(!retryable);
    }

    #[tokio::test]
    async fn outcome_serializes_with_status_tag() {
        let (service, screening_id) = service().await;

        let outcome = service.purchase(screening_id, "Ann", "ann@example.com", 1).await;
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["tickets"][0]["seat_number"], 3);
    }

    #[tokio::test]
    async fn history_items_flatten_the_join() {
        let (service, screening_id) = service().await;
        service.purchase(screening_id, "Ann", "ann@example.com", 1).await;

        let history = service.get_history("ann@example.com").await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movie_title, "Oppenheimer");
        assert_eq!(history[0].purchase_time, "2025-01-01T09:00:00Z");
        assert_eq!(history[0].total_price, Money::from_minor(45_000));
    }
}

//! Read paths composed from the catalog, inventory and ledger.

use crate::error::{BookingError, Result};
use crate::store::BookingStore;
use crate::types::{HallUtilization, HistoryEntry, Movie, MovieId, Screening, Ticket};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Answers "what can I book" and "what did I book".
pub struct QueryLayer<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryLayer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: BookingStore> QueryLayer<S> {
    /// Query layer over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Movies with at least one screening after `now` that still has
    /// seats, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Persistence`] if the backend fails.
    pub async fn available_movies(&self, now: DateTime<Utc>) -> Result<Vec<Movie>> {
        let bookable = self.store.movies_with_future_screenings(now).await?;
        Ok(self
            .store
            .list_movies()
            .await?
            .into_iter()
            .filter(|movie| bookable.contains(&movie.id))
            .collect())
    }

    /// Bookable screenings of one movie, earliest first.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`] for a non-positive id
    /// - [`BookingError::MovieNotFound`] if the movie is not in the catalog
    /// - [`BookingError::Persistence`] if the backend fails
    pub async fn screenings_for_movie(
        &self,
        movie_id: MovieId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Screening>> {
        if movie_id.get() <= 0 {
            return Err(BookingError::InvalidInput(format!(
                "movie id must be positive, got {movie_id}"
            )));
        }
        self.store.get_movie(movie_id).await?;
        self.store.list_by_movie(movie_id, now).await
    }

    /// Tickets bought under `email`, most recent first, joined with their
    /// screening and movie.
    ///
    /// A ticket whose screening or movie cannot be resolved is left out and
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Persistence`] if the backend fails.
    #[tracing::instrument(skip(self))]
    pub async fn purchase_history(&self, email: &str) -> Result<Vec<HistoryEntry>> {
        let tickets = self.store.list_by_customer_email(email).await?;
        let mut entries = Vec::with_capacity(tickets.len());

        for ticket in tickets {
            if let Some(entry) = self.resolve(ticket).await? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    async fn resolve(&self, ticket: Ticket) -> Result<Option<HistoryEntry>> {
        let screening = match self.store.get_screening(ticket.screening_id).await {
            Ok(screening) => screening,
            Err(err) if err.is_not_found() => {
                tracing::warn!(ticket_id = %ticket.id, screening_id = %ticket.screening_id, "History ticket has no screening");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let movie = match self.store.get_movie(screening.movie_id).await {
            Ok(movie) => movie,
            Err(BookingError::MovieNotFound(movie_id)) => {
                tracing::warn!(ticket_id = %ticket.id, movie_id = %movie_id, "History ticket has no movie");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        Ok(Some(HistoryEntry {
            ticket,
            movie_title: movie.title,
            screening_starts_at: screening.starts_at,
            hall_number: screening.hall_number,
        }))
    }

    /// Seats offered and sold per hall over every screening, by hall number.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Persistence`] if the backend fails.
    pub async fn hall_utilization(&self) -> Result<Vec<HallUtilization>> {
        let mut halls: BTreeMap<u32, HallUtilization> = BTreeMap::new();

        for screening in self.store.list_screenings().await? {
            let hall = halls
                .entry(screening.hall_number)
                .or_insert(HallUtilization {
                    hall_number: screening.hall_number,
                    total_seats: 0,
                    sold_seats: 0,
                });
            hall.total_seats += u64::from(screening.capacity.value());
            hall.sold_seats += u64::from(screening.sold_seats());
        }

        Ok(halls.into_values().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::seating::Reservation;
    use crate::store::{Catalog, CatalogSeeder, ScreeningInventory, TicketLedger, sort_newest_first};
    use crate::types::{
        Availability, Capacity, Customer, Money, NewMovie, NewScreening, ScreeningId, SeatNumber,
        TicketDraft, TicketId,
    };
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    async fn screening(
        store: &InMemoryStore,
        movie_id: MovieId,
        offset: Duration,
        hall: u32,
        capacity: u32,
    ) -> Screening {
        store
            .add_screening(NewScreening::new(
                movie_id,
                now() + offset,
                hall,
                Money::from_minor(40_000),
                Capacity::new(capacity),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn available_movies_skips_past_and_sold_out() {
        let store = Arc::new(InMemoryStore::new());
        let past = store.add_movie(NewMovie::new("Past", "Drama", 90, 7.0)).await.unwrap();
        let sold = store.add_movie(NewMovie::new("Sold", "Drama", 90, 7.0)).await.unwrap();
        let open = store.add_movie(NewMovie::new("Open", "Drama", 90, 7.0)).await.unwrap();

        screening(&store, past.id, -Duration::hours(1), 1, 10).await;
        let full = screening(&store, sold.id, Duration::hours(1), 1, 1).await;
        screening(&store, open.id, Duration::hours(1), 1, 10).await;
        store
            .reserve_and_issue(full.id, 1, &Customer::new("A", "a@example.com"), now())
            .await
            .unwrap();

        let queries = QueryLayer::new(store);
        let titles: Vec<_> = queries
            .available_movies(now())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Open"]);
    }

    #[tokio::test]
    async fn screenings_for_unknown_movie_is_not_found() {
        let queries = QueryLayer::new(Arc::new(InMemoryStore::new()));
        let err = queries.screenings_for_movie(MovieId::new(3), now()).await.unwrap_err();
        assert_eq!(err, BookingError::MovieNotFound(MovieId::new(3)));
    }

    #[tokio::test]
    async fn screenings_for_non_positive_movie_id_is_invalid() {
        let queries = QueryLayer::new(Arc::new(InMemoryStore::new()));

        for id in [0, -4] {
            let err = queries.screenings_for_movie(MovieId::new(id), now()).await.unwrap_err();
            assert!(matches!(err, BookingError::InvalidInput(_)), "id {id}: {err:?}");
        }
    }

    #[tokio::test]
    async fn screenings_are_listed_earliest_first() {
        let store = Arc::new(InMemoryStore::new());
        let movie = store.add_movie(NewMovie::new("Barbie", "Comedy", 114, 7.5)).await.unwrap();
        let late = screening(&store, movie.id, Duration::hours(6), 1, 10).await;
        let early = screening(&store, movie.id, Duration::hours(3), 2, 10).await;

        let ids: Vec<_> = QueryLayer::new(store)
            .screenings_for_movie(movie.id, now())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    /// Memory store whose ledger also reports one ticket for a screening
    /// that does not exist.
    struct WithOrphan {
        inner: InMemoryStore,
        orphan: Ticket,
    }

    impl Catalog for WithOrphan {
        async fn list_movies(&self) -> Result<Vec<Movie>> {
            self.inner.list_movies().await
        }

        async fn get_movie(&self, id: MovieId) -> Result<Movie> {
            self.inner.get_movie(id).await
        }
    }

    impl ScreeningInventory for WithOrphan {
        async fn get_screening(&self, id: ScreeningId) -> Result<Screening> {
            self.inner.get_screening(id).await
        }

        async fn get_availability(&self, id: ScreeningId) -> Result<Availability> {
            self.inner.get_availability(id).await
        }

        async fn reserve(&self, id: ScreeningId, seat_count: u32) -> Result<Reservation> {
            self.inner.reserve(id, seat_count).await
        }

        async fn list_by_movie(&self, movie_id: MovieId, after: DateTime<Utc>) -> Result<Vec<Screening>> {
            self.inner.list_by_movie(movie_id, after).await
        }

        async fn movies_with_future_screenings(&self, after: DateTime<Utc>) -> Result<HashSet<MovieId>> {
            self.inner.movies_with_future_screenings(after).await
        }

        async fn list_screenings(&self) -> Result<Vec<Screening>> {
            self.inner.list_screenings().await
        }
    }

    impl TicketLedger for WithOrphan {
        async fn append(&self, draft: TicketDraft) -> Result<Ticket> {
            self.inner.append(draft).await
        }

        async fn list_by_customer_email(&self, email: &str) -> Result<Vec<Ticket>> {
            let mut tickets = self.inner.list_by_customer_email(email).await?;
            if self.orphan.customer_email == email {
                tickets.push(self.orphan.clone());
                sort_newest_first(&mut tickets);
            }
            Ok(tickets)
        }

        async fn list_by_screening(&self, id: ScreeningId) -> Result<Vec<Ticket>> {
            self.inner.list_by_screening(id).await
        }
    }

    impl BookingStore for WithOrphan {
        async fn reserve_and_issue(
            &self,
            id: ScreeningId,
            seat_count: u32,
            customer: &Customer,
            purchased_at: DateTime<Utc>,
        ) -> Result<Vec<Ticket>> {
            self.inner.reserve_and_issue(id, seat_count, customer, purchased_at).await
        }
    }

    #[tokio::test]
    async fn orphaned_tickets_are_dropped_from_history() {
        let inner = InMemoryStore::new();
        let movie = inner.add_movie(NewMovie::new("Barbie", "Comedy", 114, 7.5)).await.unwrap();
        let real = screening(&inner, movie.id, Duration::hours(2), 2, 10).await;
        let customer = Customer::new("Ann", "ann@example.com");
        inner.reserve_and_issue(real.id, 1, &customer, now()).await.unwrap();

        let orphan = TicketDraft {
            screening_id: ScreeningId::new(999),
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            seat_number: SeatNumber::new(1),
            purchased_at: now() + Duration::minutes(5),
            total_price: Money::from_minor(1),
        }
        .with_id(TicketId::new(500));
        let store = Arc::new(WithOrphan { inner, orphan });

        let history = QueryLayer::new(store).purchase_history("ann@example.com").await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movie_title, "Barbie");
        assert_eq!(history[0].hall_number, 2);
        assert_eq!(history[0].ticket.screening_id, real.id);
    }

    #[tokio::test]
    async fn utilization_groups_by_hall() {
        let store = Arc::new(InMemoryStore::new());
        let movie = store.add_movie(NewMovie::new("Barbie", "Comedy", 114, 7.5)).await.unwrap();
        let a = screening(&store, movie.id, Duration::hours(1), 2, 100).await;
        screening(&store, movie.id, Duration::hours(4), 2, 100).await;
        screening(&store, movie.id, Duration::hours(1), 1, 50).await;
        store
            .reserve_and_issue(a.id, 25, &Customer::new("A", "a@example.com"), now())
            .await
            .unwrap();

        let halls = QueryLayer::new(store).hall_utilization().await.unwrap();

        assert_eq!(
            halls,
            vec![
                HallUtilization { hall_number: 1, total_seats: 50, sold_seats: 0 },
                HallUtilization { hall_number: 2, total_seats: 200, sold_seats: 25 },
            ]
        );
    }
}

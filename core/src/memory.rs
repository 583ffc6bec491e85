//! In-memory booking store.
//!
//! Each screening is a shard behind its own `RwLock` holding the seat counter
//! and the tickets issued against it. A purchase takes only its screening's
//! write lock, so the counter decrement and the ticket append are a single
//! critical section, and purchases against different screenings never wait
//! on each other. Lookups by customer email read every shard in turn.

use crate::error::{BookingError, Result};
use crate::seating::{CountdownAllocator, Reservation, SeatAllocator, reserve_seats};
use crate::store::{
    BookingStore, Catalog, CatalogSeeder, ScreeningInventory, TicketLedger, sort_newest_first,
};
use crate::types::{
    Availability, Customer, Movie, MovieId, NewMovie, NewScreening, Screening, ScreeningId, Ticket,
    TicketDraft, TicketId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Identity generator owned by one collection.
#[derive(Debug)]
struct IdSequence(AtomicI64);

impl IdSequence {
    const fn new() -> Self {
        Self(AtomicI64::new(1))
    }

    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// A screening's counter and its tickets, in id order.
#[derive(Debug)]
struct ScreeningShard {
    screening: Screening,
    tickets: Vec<Ticket>,
}

type ShardRef = Arc<RwLock<ScreeningShard>>;

/// Booking store kept entirely in process memory.
///
/// # Example
///
/// ```
/// use cinema_core::memory::InMemoryStore;
/// use cinema_core::store::{CatalogSeeder, BookingStore};
/// use cinema_core::{Capacity, Customer, Money, NewMovie, NewScreening};
/// use chrono::{Duration, Utc};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let movie = store.add_movie(NewMovie::new("Barbie", "Comedy", 114, 7.5)).await?;
/// let screening = store
///     .add_screening(NewScreening::new(
///         movie.id,
///         Utc::now() + Duration::days(1),
///         1,
///         Money::from_minor(40_000),
///         Capacity::new(100),
///     ))
///     .await?;
///
/// let tickets = store
///     .reserve_and_issue(screening.id, 2, &Customer::new("Ann", "ann@example.com"), Utc::now())
///     .await?;
/// assert_eq!(tickets.len(), 2);
/// # Ok::<(), cinema_core::BookingError>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    movies: RwLock<BTreeMap<MovieId, Movie>>,
    screenings: RwLock<BTreeMap<ScreeningId, ShardRef>>,
    movie_ids: IdSequence,
    screening_ids: IdSequence,
    ticket_ids: IdSequence,
    allocator: Arc<dyn SeatAllocator>,
}

impl InMemoryStore {
    /// Create an empty store using countdown seat numbering.
    #[must_use]
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(CountdownAllocator))
    }

    /// Create an empty store with a custom seat allocator.
    #[must_use]
    pub fn with_allocator(allocator: Arc<dyn SeatAllocator>) -> Self {
        Self {
            movies: RwLock::new(BTreeMap::new()),
            screenings: RwLock::new(BTreeMap::new()),
            movie_ids: IdSequence::new(),
            screening_ids: IdSequence::new(),
            ticket_ids: IdSequence::new(),
            allocator,
        }
    }

    async fn shard(&self, id: ScreeningId) -> Result<ShardRef> {
        self.screenings
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(BookingError::ScreeningNotFound(id))
    }

    async fn all_shards(&self) -> Vec<ShardRef> {
        self.screenings.read().await.values().cloned().collect()
    }

    async fn snapshot(&self) -> Vec<Screening> {
        let mut screenings = Vec::new();
        for shard in self.all_shards().await {
            screenings.push(shard.read().await.screening.clone());
        }
        screenings
    }

    fn issue(&self, shard: &mut ScreeningShard, draft: TicketDraft) -> Ticket {
        let ticket = draft.with_id(TicketId::new(self.ticket_ids.next()));
        shard.tickets.push(ticket.clone());
        ticket
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for InMemoryStore {
    async fn list_movies(&self) -> Result<Vec<Movie>> {
        Ok(self.movies.read().await.values().cloned().collect())
    }

    async fn get_movie(&self, id: MovieId) -> Result<Movie> {
        self.movies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(BookingError::MovieNotFound(id))
    }
}

impl ScreeningInventory for InMemoryStore {
    async fn get_screening(&self, id: ScreeningId) -> Result<Screening> {
        let shard = self.shard(id).await?;
        let screening = shard.read().await.screening.clone();
        Ok(screening)
    }

    async fn get_availability(&self, id: ScreeningId) -> Result<Availability> {
        let shard = self.shard(id).await?;
        let availability = shard.read().await.screening.availability();
        Ok(availability)
    }

    async fn reserve(&self, id: ScreeningId, seat_count: u32) -> Result<Reservation> {
        let shard = self.shard(id).await?;
        let mut shard = shard.write().await;
        let reservation = reserve_seats(
            id,
            shard.screening.available_seats,
            shard.screening.price,
            seat_count,
            self.allocator.as_ref(),
        )?;
        shard.screening.available_seats = reservation.remaining;
        Ok(reservation)
    }

    async fn list_by_movie(
        &self,
        movie_id: MovieId,
        after: DateTime<Utc>,
    ) -> Result<Vec<Screening>> {
        let mut screenings: Vec<Screening> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|s| s.movie_id == movie_id && s.is_bookable_after(after))
            .collect();
        screenings.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));
        Ok(screenings)
    }

    async fn movies_with_future_screenings(
        &self,
        after: DateTime<Utc>,
    ) -> Result<HashSet<MovieId>> {
        Ok(self
            .snapshot()
            .await
            .into_iter()
            .filter(|s| s.is_bookable_after(after))
            .map(|s| s.movie_id)
            .collect())
    }

    async fn list_screenings(&self) -> Result<Vec<Screening>> {
        Ok(self.snapshot().await)
    }
}

impl TicketLedger for InMemoryStore {
    async fn append(&self, draft: TicketDraft) -> Result<Ticket> {
        let shard = self.shard(draft.screening_id).await?;
        let mut shard = shard.write().await;
        Ok(self.issue(&mut shard, draft))
    }

    async fn list_by_customer_email(&self, email: &str) -> Result<Vec<Ticket>> {
        let mut tickets = Vec::new();
        for shard in self.all_shards().await {
            let shard = shard.read().await;
            tickets.extend(
                shard
                    .tickets
                    .iter()
                    .filter(|t| t.customer_email == email)
                    .cloned(),
            );
        }
        sort_newest_first(&mut tickets);
        Ok(tickets)
    }

    async fn list_by_screening(&self, id: ScreeningId) -> Result<Vec<Ticket>> {
        match self.shard(id).await {
            Ok(shard) => Ok(shard.read().await.tickets.clone()),
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}

impl BookingStore for InMemoryStore {
    async fn reserve_and_issue(
        &self,
        id: ScreeningId,
        seat_count: u32,
        customer: &Customer,
        purchased_at: DateTime<Utc>,
    ) -> Result<Vec<Ticket>> {
        let shard = self.shard(id).await?;
        let mut shard = shard.write().await;

        let reservation = reserve_seats(
            id,
            shard.screening.available_seats,
            shard.screening.price,
            seat_count,
            self.allocator.as_ref(),
        )?;

        let tickets: Vec<Ticket> = reservation
            .ticket_drafts(customer, purchased_at)
            .into_iter()
            .map(|draft| self.issue(&mut shard, draft))
            .collect();
        shard.screening.available_seats = reservation.remaining;

        tracing::debug!(
            screening_id = %id,
            seats = ?reservation.seats,
            remaining = reservation.remaining,
            "Seats reserved"
        );

        Ok(tickets)
    }
}

impl CatalogSeeder for InMemoryStore {
    async fn add_movie(&self, movie: NewMovie) -> Result<Movie> {
        let mut movies = self.movies.write().await;
        let movie = movie.with_id(MovieId::new(self.movie_ids.next()));
        movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn add_screening(&self, screening: NewScreening) -> Result<Screening> {
        if !self.movies.read().await.contains_key(&screening.movie_id) {
            return Err(BookingError::MovieNotFound(screening.movie_id));
        }

        let mut screenings = self.screenings.write().await;
        let screening = screening.with_id(ScreeningId::new(self.screening_ids.next()));
        let shard = ScreeningShard {
            screening: screening.clone(),
            tickets: Vec::new(),
        };
        screenings.insert(screening.id, Arc::new(RwLock::new(shard)));
        Ok(screening)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{Capacity, Money, SeatNumber};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    async fn store_with_screening(capacity: u32) -> (InMemoryStore, Screening) {
        let store = InMemoryStore::new();
        let movie = store
            .add_movie(NewMovie::new("Oppenheimer", "Drama", 180, 8.8))
            .await
            .unwrap();
        let screening = store
            .add_screening(NewScreening::new(
                movie.id,
                now() + Duration::hours(2),
                2,
                Money::from_minor(45_000),
                Capacity::new(capacity),
            ))
            .await
            .unwrap();
        (store, screening)
    }

    #[tokio::test]
    async fn reserve_decrements_and_counts_down() {
        let (store, screening) = store_with_screening(100).await;

        let reservation = store.reserve(screening.id, 3).await.unwrap();

        assert_eq!(
            reservation.seats,
            vec![SeatNumber::new(100), SeatNumber::new(99), SeatNumber::new(98)]
        );
        assert_eq!(
            store.get_availability(screening.id).await.unwrap().available_seats,
            97
        );
    }

    #[tokio::test]
    async fn failed_reserve_leaves_counter_untouched() {
        let (store, screening) = store_with_screening(2).await;

        let err = store.reserve(screening.id, 5).await.unwrap_err();

        assert!(matches!(err, BookingError::InsufficientSeats { available: 2, .. }));
        assert_eq!(
            store.get_availability(screening.id).await.unwrap().available_seats,
            2
        );
    }

    #[tokio::test]
    async fn unknown_screening_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.reserve(ScreeningId::new(42), 1).await.unwrap_err();
        assert_eq!(err, BookingError::ScreeningNotFound(ScreeningId::new(42)));
    }

    #[tokio::test]
    async fn screening_for_unknown_movie_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .add_screening(NewScreening::new(
                MovieId::new(9),
                now(),
                1,
                Money::from_minor(1),
                Capacity::STANDARD,
            ))
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::MovieNotFound(MovieId::new(9)));
    }

    #[tokio::test]
    async fn ids_are_assigned_per_collection() {
        let (store, screening) = store_with_screening(10).await;
        assert_eq!(screening.id, ScreeningId::new(1));
        assert_eq!(screening.movie_id, MovieId::new(1));

        let customer = Customer::new("Ann", "ann@example.com");
        let tickets = store
            .reserve_and_issue(screening.id, 2, &customer, now())
            .await
            .unwrap();
        assert_eq!(
            tickets.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![TicketId::new(1), TicketId::new(2)]
        );
    }

    #[tokio::test]
    async fn tickets_are_found_by_email_and_screening() {
        let (store, screening) = store_with_screening(10).await;
        let ann = Customer::new("Ann", "ann@example.com");
        let bob = Customer::new("Bob", "bob@example.com");

        store.reserve_and_issue(screening.id, 1, &ann, now()).await.unwrap();
        store
            .reserve_and_issue(screening.id, 2, &bob, now() + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(store.list_by_customer_email("ann@example.com").await.unwrap().len(), 1);
        assert_eq!(store.list_by_customer_email("bob@example.com").await.unwrap().len(), 2);
        assert!(store.list_by_customer_email("eve@example.com").await.unwrap().is_empty());
        assert_eq!(store.list_by_screening(screening.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn purchase_does_not_wait_on_another_screenings_lock() {
        let (store, first) = store_with_screening(10).await;
        let second = store
            .add_screening(NewScreening::new(
                first.movie_id,
                now() + Duration::hours(5),
                1,
                Money::from_minor(45_000),
                Capacity::new(10),
            ))
            .await
            .unwrap();

        let held = store.shard(first.id).await.unwrap();
        let _guard = held.write().await;

        let tickets = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.reserve_and_issue(second.id, 2, &Customer::new("Ann", "ann@example.com"), now()),
        )
        .await
        .expect("purchase blocked by an unrelated screening")
        .unwrap();

        assert_eq!(tickets.len(), 2);
        assert_eq!(store.list_by_screening(second.id).await.unwrap(), tickets);
    }

    #[tokio::test]
    async fn append_requires_a_known_screening() {
        let store = InMemoryStore::new();

        let err = store
            .append(TicketDraft {
                screening_id: ScreeningId::new(7),
                customer_name: "Eve".to_string(),
                customer_email: "eve@example.com".to_string(),
                seat_number: SeatNumber::new(1),
                purchased_at: now(),
                total_price: Money::from_minor(1),
            })
            .await
            .unwrap_err();

        assert_eq!(err, BookingError::ScreeningNotFound(ScreeningId::new(7)));
        assert!(store.list_by_customer_email("eve@example.com").await.unwrap().is_empty());
    }
}

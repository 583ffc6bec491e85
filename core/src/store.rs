//! Storage traits shared by every backend.
//!
//! The in-memory backend ([`crate::memory::InMemoryStore`]) and the SQLite
//! backend (`cinema-sqlite`) both implement this trait family, and the
//! engine, query layer and service are generic over it.
//!
//! # Atomicity
//!
//! [`ScreeningInventory::reserve`] and [`TicketLedger::append`] are the
//! individual contracts. A purchase must commit both together, so purchases
//! go through [`BookingStore::reserve_and_issue`], which each backend runs as
//! one unit: a per-screening critical section in memory, a single
//! transaction in SQLite.
//!
//! # Dyn Compatibility
//!
//! Methods return `impl Future + Send` so callers can spawn purchases on a
//! multi-threaded runtime. The traits are used through generics, not
//! `dyn`.

use crate::error::Result;
use crate::seating::Reservation;
use crate::types::{
    Availability, Customer, Movie, MovieId, NewMovie, NewScreening, Screening, ScreeningId, Ticket,
    TicketDraft,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;

/// Read-only reference data: movies.
pub trait Catalog: Send + Sync {
    /// All movies, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    fn list_movies(&self) -> impl Future<Output = Result<Vec<Movie>>> + Send;

    /// A single movie.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::MovieNotFound`] for an unknown id.
    fn get_movie(&self, id: MovieId) -> impl Future<Output = Result<Movie>> + Send;
}

/// Per-screening seat counters.
pub trait ScreeningInventory: Send + Sync {
    /// A single screening.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::ScreeningNotFound`] for an unknown id.
    fn get_screening(&self, id: ScreeningId) -> impl Future<Output = Result<Screening>> + Send;

    /// Remaining seats and unit price.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::ScreeningNotFound`] for an unknown id.
    fn get_availability(
        &self,
        id: ScreeningId,
    ) -> impl Future<Output = Result<Availability>> + Send;

    /// Take `seat_count` seats off the counter and assign their numbers.
    ///
    /// All or nothing: on error the counter is untouched. This does not issue
    /// tickets; purchases use [`BookingStore::reserve_and_issue`].
    ///
    /// # Errors
    ///
    /// - [`crate::BookingError::InvalidInput`] if `seat_count` is zero
    /// - [`crate::BookingError::ScreeningNotFound`] for an unknown id
    /// - [`crate::BookingError::InsufficientSeats`] if too few seats remain
    fn reserve(
        &self,
        id: ScreeningId,
        seat_count: u32,
    ) -> impl Future<Output = Result<Reservation>> + Send;

    /// Screenings of `movie_id` starting after `after` with seats left,
    /// ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    fn list_by_movie(
        &self,
        movie_id: MovieId,
        after: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Screening>>> + Send;

    /// Movies with at least one screening starting after `after` with seats left.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    fn movies_with_future_screenings(
        &self,
        after: DateTime<Utc>,
    ) -> impl Future<Output = Result<HashSet<MovieId>>> + Send;

    /// Every screening, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    fn list_screenings(&self) -> impl Future<Output = Result<Vec<Screening>>> + Send;
}

/// Append-only record of issued tickets.
pub trait TicketLedger: Send + Sync {
    /// Store a ticket and assign its id.
    ///
    /// # Errors
    ///
    /// - [`crate::BookingError::ScreeningNotFound`] if the in-memory backend
    ///   has no such screening
    /// - [`crate::BookingError::Persistence`] if the backend fails, including
    ///   a SQLite constraint violation (unknown screening, seat already issued)
    fn append(&self, draft: TicketDraft) -> impl Future<Output = Result<Ticket>> + Send;

    /// Tickets bought under `email`, most recent purchase first.
    ///
    /// Ties on purchase time are broken by ticket id, highest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    fn list_by_customer_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Vec<Ticket>>> + Send;

    /// Tickets issued for one screening, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    fn list_by_screening(
        &self,
        id: ScreeningId,
    ) -> impl Future<Output = Result<Vec<Ticket>>> + Send;
}

/// A complete backend: catalog, inventory and ledger with an atomic purchase.
pub trait BookingStore: Catalog + ScreeningInventory + TicketLedger {
    /// Reserve seats and append one ticket per seat as a single atomic unit.
    ///
    /// Purchases against the same screening serialize; purchases against
    /// different screenings do not block each other.
    ///
    /// # Errors
    ///
    /// - [`crate::BookingError::InvalidInput`] if `seat_count` is zero
    /// - [`crate::BookingError::ScreeningNotFound`] for an unknown id
    /// - [`crate::BookingError::InsufficientSeats`] if too few seats remain
    /// - [`crate::BookingError::Persistence`] if the backend fails; nothing
    ///   was committed
    fn reserve_and_issue(
        &self,
        id: ScreeningId,
        seat_count: u32,
        customer: &Customer,
        purchased_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Ticket>>> + Send;
}

/// Write access used to load reference data.
pub trait CatalogSeeder: Send + Sync {
    /// Add a movie to the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::Persistence`] if the backend fails.
    fn add_movie(&self, movie: NewMovie) -> impl Future<Output = Result<Movie>> + Send;

    /// Schedule a screening with every seat available.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BookingError::MovieNotFound`] if the movie is unknown.
    fn add_screening(
        &self,
        screening: NewScreening,
    ) -> impl Future<Output = Result<Screening>> + Send;
}

/// Orders tickets most recent first, newest id first on equal timestamps.
pub fn sort_newest_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| {
        b.purchased_at
            .cmp(&a.purchased_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

//! Domain types for the cinema booking system.
//!
//! Identifiers, value objects, and the three entities (`Movie`, `Screening`,
//! `Ticket`) shared by every storage backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a movie
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MovieId(i64);

impl MovieId {
    /// Creates a `MovieId` from a raw row id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a screening
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScreeningId(i64);

impl ScreeningId {
    /// Creates a `ScreeningId` from a raw row id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ScreeningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(i64);

impl TicketId {
    /// Creates a `TicketId` from a raw row id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (minor units to avoid floating point errors)
// ============================================================================

/// Represents money in minor units (kopecks, cents)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Creates a `Money` value from whole units with overflow checking
    #[must_use]
    pub const fn checked_from_major(major: u64) -> Option<Self> {
        match major.checked_mul(100) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole units (rounded down)
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.0 / 100
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major(), self.0 % 100)
    }
}

// ============================================================================
// Seating Value Objects
// ============================================================================

/// Seat capacity of a screening, fixed at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Capacity used by the sample catalog and by default screenings
    pub const STANDARD: Self = Self(100);

    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seat number printed on a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatNumber(u32);

impl SeatNumber {
    /// Creates a new `SeatNumber`
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the seat number
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A movie in the catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Movie identifier
    pub id: MovieId,
    /// Title
    pub title: String,
    /// Genre
    pub genre: String,
    /// Running time in minutes
    pub duration_minutes: u32,
    /// Audience rating (0.0 - 10.0)
    pub rating: f64,
}

/// A movie that has not been stored yet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    /// Title
    pub title: String,
    /// Genre
    pub genre: String,
    /// Running time in minutes
    pub duration_minutes: u32,
    /// Audience rating (0.0 - 10.0)
    pub rating: f64,
}

impl NewMovie {
    /// Creates a new `NewMovie`
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        genre: impl Into<String>,
        duration_minutes: u32,
        rating: f64,
    ) -> Self {
        Self {
            title: title.into(),
            genre: genre.into(),
            duration_minutes,
            rating,
        }
    }

    /// Attaches the identity assigned by a store
    #[must_use]
    pub fn with_id(self, id: MovieId) -> Movie {
        Movie {
            id,
            title: self.title,
            genre: self.genre,
            duration_minutes: self.duration_minutes,
            rating: self.rating,
        }
    }
}

/// A scheduled showing of a movie
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screening {
    /// Screening identifier
    pub id: ScreeningId,
    /// Movie being shown
    pub movie_id: MovieId,
    /// When the screening starts
    pub starts_at: DateTime<Utc>,
    /// Hall number
    pub hall_number: u32,
    /// Price of a single seat
    pub price: Money,
    /// Total seats in the hall for this screening
    pub capacity: Capacity,
    /// Seats still available for purchase
    pub available_seats: u32,
}

impl Screening {
    /// Number of seats already sold
    #[must_use]
    pub const fn sold_seats(&self) -> u32 {
        self.capacity.value().saturating_sub(self.available_seats)
    }

    /// True once every seat has been sold
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }

    /// True when the screening starts after `now` and still has seats
    #[must_use]
    pub fn is_bookable_after(&self, now: DateTime<Utc>) -> bool {
        self.starts_at > now && !self.is_sold_out()
    }

    /// Availability snapshot for this screening
    #[must_use]
    pub const fn availability(&self) -> Availability {
        Availability {
            available_seats: self.available_seats,
            price: self.price,
        }
    }
}

/// A screening that has not been stored yet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScreening {
    /// Movie being shown
    pub movie_id: MovieId,
    /// When the screening starts
    pub starts_at: DateTime<Utc>,
    /// Hall number
    pub hall_number: u32,
    /// Price of a single seat
    pub price: Money,
    /// Total seats; every seat starts available
    pub capacity: Capacity,
}

impl NewScreening {
    /// Creates a new `NewScreening`
    #[must_use]
    pub const fn new(
        movie_id: MovieId,
        starts_at: DateTime<Utc>,
        hall_number: u32,
        price: Money,
        capacity: Capacity,
    ) -> Self {
        Self {
            movie_id,
            starts_at,
            hall_number,
            price,
            capacity,
        }
    }

    /// Attaches the identity assigned by a store
    #[must_use]
    pub const fn with_id(self, id: ScreeningId) -> Screening {
        Screening {
            id,
            movie_id: self.movie_id,
            starts_at: self.starts_at,
            hall_number: self.hall_number,
            price: self.price,
            capacity: self.capacity,
            available_seats: self.capacity.value(),
        }
    }
}

/// Remaining seats and unit price of one screening
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Seats still available
    pub available_seats: u32,
    /// Price of a single seat
    pub price: Money,
}

/// An issued ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Screening the ticket admits to
    pub screening_id: ScreeningId,
    /// Customer name as given at purchase
    pub customer_name: String,
    /// Customer email, used as the history lookup key
    pub customer_email: String,
    /// Assigned seat
    pub seat_number: SeatNumber,
    /// When the ticket was purchased
    pub purchased_at: DateTime<Utc>,
    /// Price paid, copied from the screening at purchase time
    pub total_price: Money,
}

/// A ticket that has not been appended to a ledger yet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    /// Screening the ticket admits to
    pub screening_id: ScreeningId,
    /// Customer name
    pub customer_name: String,
    /// Customer email
    pub customer_email: String,
    /// Assigned seat
    pub seat_number: SeatNumber,
    /// Purchase timestamp
    pub purchased_at: DateTime<Utc>,
    /// Price paid
    pub total_price: Money,
}

impl TicketDraft {
    /// Attaches the identity assigned by a ledger
    #[must_use]
    pub fn with_id(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            screening_id: self.screening_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            seat_number: self.seat_number,
            purchased_at: self.purchased_at,
            total_price: self.total_price,
        }
    }
}

/// Who is buying, and when
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer name
    pub name: String,
    /// Customer email
    pub email: String,
}

impl Customer {
    /// Creates a new `Customer`
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// One row of a customer's purchase history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The issued ticket
    pub ticket: Ticket,
    /// Title of the movie shown
    pub movie_title: String,
    /// When the screening starts
    pub screening_starts_at: DateTime<Utc>,
    /// Hall of the screening
    pub hall_number: u32,
}

/// Seat usage of one hall, summed over all of its screenings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallUtilization {
    /// Hall number
    pub hall_number: u32,
    /// Seats offered across all screenings in the hall
    pub total_seats: u64,
    /// Seats sold across all screenings in the hall
    pub sold_seats: u64,
}

impl HallUtilization {
    /// Percentage of seats sold (0.0 - 100.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total_seats == 0 {
            return 0.0;
        }
        self.sold_seats as f64 * 100.0 / self.total_seats as f64
    }
}

//! Seat assignment for a single screening.
//!
//! A backend calls [`reserve_seats`] while it holds exclusive access to one
//! screening's counter. The seat numbering policy itself is pluggable through
//! [`SeatAllocator`], so a seat-map allocator can replace the countdown policy
//! without touching the reservation engine or the ledger.

use crate::error::{BookingError, Result};
use crate::types::{Customer, Money, ScreeningId, SeatNumber, TicketDraft};
use chrono::{DateTime, Utc};
use std::fmt;

/// Chooses seat numbers for a purchase.
///
/// Implementations must return exactly `seat_count` distinct seats, and seats
/// returned for successive calls (with `available` decreasing by the previous
/// `seat_count`) must never repeat.
pub trait SeatAllocator: Send + Sync + fmt::Debug {
    /// Assign `seat_count` seats given `available` seats before the purchase.
    ///
    /// Callers guarantee `1 <= seat_count <= available`.
    fn allocate(&self, available: u32, seat_count: u32) -> Vec<SeatNumber>;
}

/// Numbers seats by counting down from the current available count.
///
/// Buying 3 seats when 97 remain assigns 97, 96, 95.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountdownAllocator;

impl SeatAllocator for CountdownAllocator {
    fn allocate(&self, available: u32, seat_count: u32) -> Vec<SeatNumber> {
        (0..seat_count)
            .map(|offset| SeatNumber::new(available - offset))
            .collect()
    }
}

/// Seats assigned to one purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    /// Screening the seats belong to
    pub screening_id: ScreeningId,
    /// Assigned seats, in allocation order
    pub seats: Vec<SeatNumber>,
    /// Price per seat at the moment of reservation
    pub unit_price: Money,
    /// Seats left after this reservation
    pub remaining: u32,
}

impl Reservation {
    /// One ticket draft per reserved seat, priced at the reserved unit price.
    #[must_use]
    pub fn ticket_drafts(&self, customer: &Customer, purchased_at: DateTime<Utc>) -> Vec<TicketDraft> {
        self.seats
            .iter()
            .map(|seat| TicketDraft {
                screening_id: self.screening_id,
                customer_name: customer.name.clone(),
                customer_email: customer.email.clone(),
                seat_number: *seat,
                purchased_at,
                total_price: self.unit_price,
            })
            .collect()
    }
}

/// Rejects requests that must never reach shared state.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] when `seat_count` is zero.
pub fn ensure_seat_count(seat_count: u32) -> Result<()> {
    if seat_count == 0 {
        return Err(BookingError::InvalidInput(
            "seat_count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Plan a reservation against a screening's current counter.
///
/// Pure: the caller applies `Reservation::remaining` to its own state only
/// when this returns `Ok`, and must hold exclusive access to the counter
/// between reading `available` and writing `remaining`.
///
/// # Errors
///
/// - [`BookingError::InvalidInput`] if `seat_count` is zero
/// - [`BookingError::InsufficientSeats`] if `seat_count > available`
pub fn reserve_seats(
    screening_id: ScreeningId,
    available: u32,
    unit_price: Money,
    seat_count: u32,
    allocator: &dyn SeatAllocator,
) -> Result<Reservation> {
    ensure_seat_count(seat_count)?;

    if seat_count > available {
        return Err(BookingError::InsufficientSeats {
            screening_id,
            requested: seat_count,
            available,
        });
    }

    let seats = allocator.allocate(available, seat_count);
    Ok(Reservation {
        screening_id,
        seats,
        unit_price,
        remaining: available - seat_count,
    })
}

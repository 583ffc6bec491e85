//! # Cinema Booking Core
//!
//! Seat inventory, reservation engine and ticket ledger for a small cinema.
//!
//! The hard part of the system is the seat invariant under concurrent
//! purchases: a screening's available count never goes negative, and two
//! tickets for the same screening never share a seat number.
//!
//! ## Components
//!
//! - **Catalog**: movies, read-only after seeding
//! - **Screening Inventory**: per-screening seat counters and seat assignment
//! - **Ticket Ledger**: append-only record of issued tickets
//! - **Reservation Engine**: validates a purchase and commits it atomically
//! - **Query Layer**: available movies, screenings, history, hall statistics
//! - **Booking Service**: the serializable contract a presentation layer calls
//!
//! Storage is abstracted by the [`store`] trait family. This crate ships the
//! in-memory backend ([`memory::InMemoryStore`]); `cinema-sqlite` provides a
//! durable one with identical behavior.
//!
//! ## Concurrency
//!
//! Purchases against the same screening serialize. Purchases against
//! different screenings never wait on each other. A purchase either decrements
//! the counter and appends all of its tickets, or does neither.
//!
//! ## Example
//!
//! ```
//! use cinema_core::memory::InMemoryStore;
//! use cinema_core::engine::ReservationEngine;
//! use cinema_core::seed::{SampleCatalogOptions, seed_sample_catalog};
//! use cinema_core::{Customer, ScreeningId};
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemoryStore::new());
//! seed_sample_catalog(store.as_ref(), Utc::now(), &SampleCatalogOptions::default()).await?;
//!
//! let engine = ReservationEngine::new(store);
//! let tickets = engine
//!     .purchase(ScreeningId::new(1), &Customer::new("Ann", "ann@example.com"), 3)
//!     .await?;
//!
//! let seats: Vec<u32> = tickets.iter().map(|t| t.seat_number.value()).collect();
//! assert_eq!(seats, vec![100, 99, 98]);
//! # Ok::<(), cinema_core::BookingError>(())
//! # }).unwrap();
//! ```

pub mod api;
pub mod engine;
pub mod environment;
pub mod error;
pub mod memory;
pub mod query;
pub mod retry;
pub mod seating;
pub mod seed;
pub mod store;
pub mod types;

pub use error::{BookingError, Result};
pub use types::{
    Availability, Capacity, Customer, HallUtilization, HistoryEntry, Money, Movie, MovieId,
    NewMovie, NewScreening, Screening, ScreeningId, SeatNumber, Ticket, TicketDraft, TicketId,
};

//! SQLite backend for the cinema booking system.
//!
//! [`SqliteBookingStore`] implements the `cinema-core` store traits on a
//! sqlx connection pool, so the engine, queries and service run unchanged
//! against a durable database.
//!
//! - Schema created on connect, idempotently
//! - WAL journal with a configurable busy timeout
//! - One transaction per purchase, guarded by a conditional decrement
//! - Driver failures surface as `BookingError::Persistence` and are retried
//!   by the reservation engine
//!
//! # Example
//!
//! ```no_run
//! use cinema_core::api::BookingService;
//! use cinema_sqlite::{SqliteBookingStore, SqliteOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteBookingStore::connect("sqlite://cinema.db", &SqliteOptions::default()).await?;
//! let service = BookingService::new(Arc::new(store));
//! let movies = service.list_available_movies().await?;
//! # Ok(())
//! # }
//! ```

mod rows;
mod schema;
mod store;

pub use store::{SqliteBookingStore, SqliteOptions};

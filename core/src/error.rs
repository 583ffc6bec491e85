//! Error taxonomy for booking operations.

use crate::types::{MovieId, ScreeningId};
use thiserror::Error;

/// Errors that can occur while browsing or purchasing.
///
/// Every failed purchase leaves the screening's available seats and the
/// ticket ledger exactly as they were.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// No movie with this id exists in the catalog.
    #[error("Movie not found: {0}")]
    MovieNotFound(MovieId),

    /// No screening with this id exists.
    #[error("Screening not found: {0}")]
    ScreeningNotFound(ScreeningId),

    /// The screening has fewer seats left than were requested.
    ///
    /// Not retried automatically; the caller may ask for fewer seats.
    #[error("Insufficient seats for screening {screening_id}: requested {requested}, available {available}")]
    InsufficientSeats {
        /// Screening the purchase was made against.
        screening_id: ScreeningId,
        /// Seats requested.
        requested: u32,
        /// Seats that were available at the time of the attempt.
        available: u32,
    },

    /// The request was malformed and never reached shared state.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The storage backend failed; any partial change was rolled back.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl BookingError {
    /// True for the `NotFound` family.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::MovieNotFound(_) | Self::ScreeningNotFound(_))
    }

    /// True when repeating the whole operation unchanged may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Stable machine-readable code, used as a metrics label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MovieNotFound(_) | Self::ScreeningNotFound(_) => "not_found",
            Self::InsufficientSeats { .. } => "insufficient_seats",
            Self::InvalidInput(_) => "invalid_input",
            Self::Persistence(_) => "persistence",
        }
    }
}

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_persistence_failures_are_retryable() {
        assert!(BookingError::Persistence("disk I/O error".into()).is_retryable());
        assert!(!BookingError::InvalidInput("seat_count".into()).is_retryable());
        assert!(
            !BookingError::InsufficientSeats {
                screening_id: ScreeningId::new(1),
                requested: 5,
                available: 2,
            }
            .is_retryable()
        );
    }

    #[test]
    fn not_found_covers_movies_and_screenings() {
        assert!(BookingError::MovieNotFound(MovieId::new(3)).is_not_found());
        assert!(BookingError::ScreeningNotFound(ScreeningId::new(3)).is_not_found());
        assert_eq!(BookingError::ScreeningNotFound(ScreeningId::new(3)).code(), "not_found");
    }

    #[test]
    fn insufficient_seats_message_names_counts() {
        let err = BookingError::InsufficientSeats {
            screening_id: ScreeningId::new(9),
            requested: 5,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient seats for screening 9: requested 5, available 2"
        );
    }
}

//! Sample catalog used by the binary, the benches and the integration tests.

use crate::error::{BookingError, Result};
use crate::store::{Catalog, CatalogSeeder};
use crate::types::{Capacity, Money, Movie, NewMovie, NewScreening};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Screenings per movie per day.
pub const SLOTS_PER_DAY: u32 = 4;
/// Hours between consecutive screenings of the same movie.
pub const SLOT_SPACING_HOURS: i64 = 3;
const FIRST_SLOT_HOUR: u32 = 10;

/// How much schedule to generate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleCatalogOptions {
    /// Days of screenings, starting with the base day
    pub days: u32,
    /// Seats per screening
    pub capacity: Capacity,
}

impl Default for SampleCatalogOptions {
    fn default() -> Self {
        Self {
            days: 7,
            capacity: Capacity::STANDARD,
        }
    }
}

/// What [`seed_sample_catalog`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The catalog already had movies; nothing was written.
    Skipped,
    /// Fresh catalog written.
    Seeded {
        /// Movies added
        movies: usize,
        /// Screenings added
        screenings: usize,
    },
}

fn sample_movies() -> [NewMovie; 5] {
    [
        NewMovie::new("Avatar: The Way of Water", "Sci-Fi", 192, 8.1),
        NewMovie::new("Oppenheimer", "Drama", 180, 8.8),
        NewMovie::new("Barbie", "Comedy", 114, 7.5),
        NewMovie::new("John Wick: Chapter 4", "Action", 169, 8.2),
        NewMovie::new("Spider-Man: Across the Spider-Verse", "Animation", 140, 9.0),
    ]
}

/// Hall a movie's screenings are assigned to: `(id % 3) + 1`.
#[must_use]
pub fn hall_for(movie: &Movie) -> u32 {
    u32::try_from(movie.id.get().rem_euclid(3)).map_or(1, |rem| rem + 1)
}

/// Seat price for a movie: `350 + id * 50` whole units.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] if the id does not yield a
/// representable price.
pub fn price_for(movie: &Movie) -> Result<Money> {
    u64::try_from(movie.id.get())
        .ok()
        .and_then(|id| id.checked_mul(50))
        .and_then(|extra| extra.checked_add(350))
        .and_then(Money::checked_from_major)
        .ok_or_else(|| BookingError::InvalidInput(format!("no price for movie {}", movie.id)))
}

/// Load five movies and their screenings into an empty store.
///
/// Each movie gets `days * 4` screenings, 3 hours apart, starting at 10:00
/// UTC on the day of `base`. A store that already has movies is left alone.
///
/// # Errors
///
/// Propagates any store failure.
#[tracing::instrument(skip(store, options), fields(days = options.days))]
pub async fn seed_sample_catalog<S>(
    store: &S,
    base: DateTime<Utc>,
    options: &SampleCatalogOptions,
) -> Result<SeedOutcome>
where
    S: Catalog + CatalogSeeder,
{
    if !store.list_movies().await?.is_empty() {
        tracing::info!("Catalog already seeded, skipping");
        return Ok(SeedOutcome::Skipped);
    }

    let first_slot = base
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
        + Duration::hours(i64::from(FIRST_SLOT_HOUR));

    let mut movies = 0;
    let mut screenings = 0;

    for new_movie in sample_movies() {
        let movie = store.add_movie(new_movie).await?;
        movies += 1;

        let hall = hall_for(&movie);
        let price = price_for(&movie)?;

        for day in 0..options.days {
            let day_start = first_slot + Duration::days(i64::from(day));
            for slot in 0..SLOTS_PER_DAY {
                let starts_at = day_start + Duration::hours(i64::from(slot) * SLOT_SPACING_HOURS);
                store
                    .add_screening(NewScreening::new(
                        movie.id,
                        starts_at,
                        hall,
                        price,
                        options.capacity,
                    ))
                    .await?;
                screenings += 1;
            }
        }
    }

    tracing::info!(movies, screenings, "Sample catalog seeded");
    Ok(SeedOutcome::Seeded { movies, screenings })
}

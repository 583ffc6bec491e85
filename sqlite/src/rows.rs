//! Conversions between SQLite rows and domain types.

use chrono::{DateTime, Utc};
use cinema_core::{
    BookingError, Capacity, Money, Movie, MovieId, Result, Screening, ScreeningId, SeatNumber,
    Ticket, TicketId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

pub(crate) const MOVIE_COLUMNS: &str = "id, title, genre, duration_minutes, rating";
pub(crate) const SCREENING_COLUMNS: &str =
    "id, movie_id, starts_at, hall_number, price_minor, capacity, available_seats";
pub(crate) const TICKET_COLUMNS: &str = "id, screening_id, customer_name, customer_email, seat_number, purchased_at, total_price_minor";

/// Maps a driver error to [`BookingError::Persistence`], tagged with the
/// operation that failed.
pub(crate) fn persistence(operation: &'static str) -> impl FnOnce(sqlx::Error) -> BookingError {
    move |err| {
        metrics::counter!("cinema_sqlite_errors_total", "operation" => operation).increment(1);
        tracing::warn!(operation, error = %err, "SQLite operation failed");
        BookingError::Persistence(format!("{operation}: {err}"))
    }
}

fn corrupt(column: &str, value: i64) -> BookingError {
    BookingError::Persistence(format!("column {column} holds out-of-range value {value}"))
}

fn column<'r, T>(row: &'r SqliteRow, name: &'static str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(persistence("decode row"))
}

fn u32_column(row: &SqliteRow, name: &'static str) -> Result<u32> {
    let value: i64 = column(row, name)?;
    u32::try_from(value).map_err(|_| corrupt(name, value))
}

fn money_column(row: &SqliteRow, name: &'static str) -> Result<Money> {
    let value: i64 = column(row, name)?;
    u64::try_from(value)
        .map(Money::from_minor)
        .map_err(|_| corrupt(name, value))
}

fn time_column(row: &SqliteRow, name: &'static str) -> Result<DateTime<Utc>> {
    let value: i64 = column(row, name)?;
    DateTime::from_timestamp_millis(value).ok_or_else(|| corrupt(name, value))
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn money_to_sql(money: Money) -> Result<i64> {
    i64::try_from(money.minor())
        .map_err(|_| BookingError::InvalidInput(format!("price {money} does not fit the database")))
}

pub(crate) fn movie(row: &SqliteRow) -> Result<Movie> {
    Ok(Movie {
        id: MovieId::new(column(row, "id")?),
        title: column(row, "title")?,
        genre: column(row, "genre")?,
        duration_minutes: u32_column(row, "duration_minutes")?,
        rating: column(row, "rating")?,
    })
}

pub(crate) fn screening(row: &SqliteRow) -> Result<Screening> {
    Ok(Screening {
        id: ScreeningId::new(column(row, "id")?),
        movie_id: MovieId::new(column(row, "movie_id")?),
        starts_at: time_column(row, "starts_at")?,
        hall_number: u32_column(row, "hall_number")?,
        price: money_column(row, "price_minor")?,
        capacity: Capacity::new(u32_column(row, "capacity")?),
        available_seats: u32_column(row, "available_seats")?,
    })
}

pub(crate) fn ticket(row: &SqliteRow) -> Result<Ticket> {
    Ok(Ticket {
        id: TicketId::new(column(row, "id")?),
        screening_id: ScreeningId::new(column(row, "screening_id")?),
        customer_name: column(row, "customer_name")?,
        customer_email: column(row, "customer_email")?,
        seat_number: SeatNumber::new(u32_column(row, "seat_number")?),
        purchased_at: time_column(row, "purchased_at")?,
        total_price: money_column(row, "total_price_minor")?,
    })
}

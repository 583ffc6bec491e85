//! [`BookingStore`] over a SQLite connection pool.

use crate::rows::{
    self, MOVIE_COLUMNS, SCREENING_COLUMNS, TICKET_COLUMNS, money_to_sql, persistence, to_millis,
};
use crate::schema;
use chrono::{DateTime, Utc};
use cinema_core::seating::{
    CountdownAllocator, Reservation, SeatAllocator, ensure_seat_count, reserve_seats,
};
use cinema_core::store::{BookingStore, Catalog, CatalogSeeder, ScreeningInventory, TicketLedger};
use cinema_core::{
    Availability, BookingError, Customer, Movie, MovieId, NewMovie, NewScreening, Result,
    Screening, ScreeningId, Ticket, TicketDraft,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Pool and locking settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqliteOptions {
    /// Maximum pooled connections
    pub max_connections: u32,
    /// How long a writer waits for the database lock before failing
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Booking store persisted in a SQLite database.
///
/// A purchase is one transaction: a conditional decrement of the
/// screening's counter followed by one insert per ticket. The decrement
/// takes SQLite's write lock, so concurrent purchases serialize on it and
/// a failed purchase rolls back completely.
///
/// # Example
///
/// ```no_run
/// use cinema_sqlite::{SqliteBookingStore, SqliteOptions};
///
/// # async fn example() -> cinema_core::Result<()> {
/// let store = SqliteBookingStore::connect("sqlite://cinema.db", &SqliteOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteBookingStore {
    pool: SqlitePool,
    allocator: Arc<dyn SeatAllocator>,
}

impl SqliteBookingStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    ///
    /// The database runs in WAL mode so readers never block the writer.
    /// Each pooled connection to `sqlite::memory:` is its own database, so
    /// tests use a file.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Persistence`] if the URL is invalid, the file
    /// cannot be opened, or the schema cannot be applied.
    pub async fn connect(url: &str, options: &SqliteOptions) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(url)
            .map_err(persistence("parse database url"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(options.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_options)
            .await
            .map_err(persistence("connect"))?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        tracing::info!(url, max_connections = options.max_connections, "SQLite store ready");
        Ok(store)
    }

    /// Wrap an existing pool. The schema is not applied; call
    /// [`SqliteBookingStore::migrate`].
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            allocator: Arc::new(CountdownAllocator),
        }
    }

    /// Replace the seat allocator.
    #[must_use]
    pub fn with_allocator(mut self, allocator: Arc<dyn SeatAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Create tables and indexes that do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Persistence`] if a statement fails.
    pub async fn migrate(&self) -> Result<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(persistence("migrate"))?;
        }
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Conditionally take `seat_count` seats inside `tx`.
    ///
    /// The UPDATE only matches while enough seats remain, so the check and
    /// the decrement are one statement under the database write lock.
    async fn take_seats(
        &self,
        tx: &mut SqliteConnection,
        id: ScreeningId,
        seat_count: u32,
    ) -> Result<Reservation> {
        ensure_seat_count(seat_count)?;
        let requested = i64::from(seat_count);

        let updated: Option<(i64, i64)> = sqlx::query_as(
            r"
            UPDATE screenings
            SET available_seats = available_seats - ?
            WHERE id = ? AND available_seats >= ?
            RETURNING available_seats, price_minor
            ",
        )
        .bind(requested)
        .bind(id.get())
        .bind(requested)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence("decrement seats"))?;

        let Some((remaining, price_minor)) = updated else {
            return Err(self.rejection(tx, id, seat_count).await);
        };

        let remaining = u32::try_from(remaining)
            .map_err(|_| BookingError::Persistence(format!("screening {id} has negative seats")))?;
        let price = u64::try_from(price_minor)
            .map(cinema_core::Money::from_minor)
            .map_err(|_| BookingError::Persistence(format!("screening {id} has a negative price")))?;

        reserve_seats(id, remaining + seat_count, price, seat_count, self.allocator.as_ref())
    }

    /// Explain why the conditional decrement matched no row.
    async fn rejection(
        &self,
        tx: &mut SqliteConnection,
        id: ScreeningId,
        requested: u32,
    ) -> BookingError {
        let available: std::result::Result<Option<(i64,)>, _> =
            sqlx::query_as("SELECT available_seats FROM screenings WHERE id = ?")
                .bind(id.get())
                .fetch_optional(&mut *tx)
                .await;

        match available {
            Ok(None) => BookingError::ScreeningNotFound(id),
            Ok(Some((available,))) => BookingError::InsufficientSeats {
                screening_id: id,
                requested,
                available: u32::try_from(available).unwrap_or(0),
            },
            Err(err) => persistence("read availability")(err),
        }
    }

    async fn insert_ticket(tx: &mut SqliteConnection, draft: TicketDraft) -> Result<Ticket> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO tickets (
                screening_id, customer_name, customer_email, seat_number,
                purchased_at, total_price_minor
            ) VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(draft.screening_id.get())
        .bind(&draft.customer_name)
        .bind(&draft.customer_email)
        .bind(i64::from(draft.seat_number.value()))
        .bind(to_millis(draft.purchased_at))
        .bind(money_to_sql(draft.total_price)?)
        .fetch_one(&mut *tx)
        .await
        .map_err(persistence("insert ticket"))?;

        // Stored timestamps are millisecond precision; return the stored row.
        rows::ticket(&row)
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(persistence("begin transaction"))
    }
}

impl Catalog for SqliteBookingStore {
    async fn list_movies(&self) -> Result<Vec<Movie>> {
        let records = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(persistence("list movies"))?;
        records.iter().map(rows::movie).collect()
    }

    async fn get_movie(&self, id: MovieId) -> Result<Movie> {
        let row = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence("get movie"))?;
        row.as_ref()
            .map_or(Err(BookingError::MovieNotFound(id)), rows::movie)
    }
}

impl ScreeningInventory for SqliteBookingStore {
    async fn get_screening(&self, id: ScreeningId) -> Result<Screening> {
        let row = sqlx::query(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = ?"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence("get screening"))?;
        row.as_ref()
            .map_or(Err(BookingError::ScreeningNotFound(id)), rows::screening)
    }

    async fn get_availability(&self, id: ScreeningId) -> Result<Availability> {
        Ok(self.get_screening(id).await?.availability())
    }

    async fn reserve(&self, id: ScreeningId, seat_count: u32) -> Result<Reservation> {
        let mut tx = self.begin().await?;
        let reservation = self.take_seats(&mut tx, id, seat_count).await?;
        tx.commit().await.map_err(persistence("commit reservation"))?;
        Ok(reservation)
    }

    async fn list_by_movie(
        &self,
        movie_id: MovieId,
        after: DateTime<Utc>,
    ) -> Result<Vec<Screening>> {
        let records = sqlx::query(&format!(
            r"
            SELECT {SCREENING_COLUMNS} FROM screenings
            WHERE movie_id = ? AND starts_at > ? AND available_seats > 0
            ORDER BY starts_at, id
            "
        ))
        .bind(movie_id.get())
        .bind(to_millis(after))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence("list screenings by movie"))?;
        records.iter().map(rows::screening).collect()
    }

    async fn movies_with_future_screenings(
        &self,
        after: DateTime<Utc>,
    ) -> Result<HashSet<MovieId>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT movie_id FROM screenings WHERE starts_at > ? AND available_seats > 0",
        )
        .bind(to_millis(after))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence("list bookable movies"))?;
        Ok(ids.into_iter().map(|(id,)| MovieId::new(id)).collect())
    }

    async fn list_screenings(&self) -> Result<Vec<Screening>> {
        let records = sqlx::query(&format!("SELECT {SCREENING_COLUMNS} FROM screenings ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(persistence("list screenings"))?;
        records.iter().map(rows::screening).collect()
    }
}

impl TicketLedger for SqliteBookingStore {
    async fn append(&self, draft: TicketDraft) -> Result<Ticket> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(persistence("acquire connection"))?;
        Self::insert_ticket(&mut conn, draft).await
    }

    async fn list_by_customer_email(&self, email: &str) -> Result<Vec<Ticket>> {
        let records = sqlx::query(&format!(
            r"
            SELECT {TICKET_COLUMNS} FROM tickets
            WHERE customer_email = ?
            ORDER BY purchased_at DESC, id DESC
            "
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence("list tickets by email"))?;
        records.iter().map(rows::ticket).collect()
    }

    async fn list_by_screening(&self, id: ScreeningId) -> Result<Vec<Ticket>> {
        let records = sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE screening_id = ? ORDER BY id"
        ))
        .bind(id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence("list tickets by screening"))?;
        records.iter().map(rows::ticket).collect()
    }
}

impl BookingStore for SqliteBookingStore {
    async fn reserve_and_issue(
        &self,
        id: ScreeningId,
        seat_count: u32,
        customer: &Customer,
        purchased_at: DateTime<Utc>,
    ) -> Result<Vec<Ticket>> {
        let mut tx = self.begin().await?;

        // Dropping `tx` on any early return rolls the decrement back.
        let reservation = self.take_seats(&mut tx, id, seat_count).await?;

        let mut tickets = Vec::with_capacity(reservation.seats.len());
        for draft in reservation.ticket_drafts(customer, purchased_at) {
            tickets.push(Self::insert_ticket(&mut tx, draft).await?);
        }

        tx.commit().await.map_err(persistence("commit purchase"))?;

        tracing::debug!(
            screening_id = %id,
            seats = ?reservation.seats,
            remaining = reservation.remaining,
            "Seats reserved"
        );

        Ok(tickets)
    }
}

impl CatalogSeeder for SqliteBookingStore {
    async fn add_movie(&self, movie: NewMovie) -> Result<Movie> {
        let (id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO movies (title, genre, duration_minutes, rating)
            VALUES (?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(&movie.title)
        .bind(&movie.genre)
        .bind(i64::from(movie.duration_minutes))
        .bind(movie.rating)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence("insert movie"))?;
        Ok(movie.with_id(MovieId::new(id)))
    }

    async fn add_screening(&self, screening: NewScreening) -> Result<Screening> {
        self.get_movie(screening.movie_id).await?;

        let capacity = i64::from(screening.capacity.value());
        let row = sqlx::query(&format!(
            r"
            INSERT INTO screenings (
                movie_id, starts_at, hall_number, price_minor, capacity, available_seats
            ) VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {SCREENING_COLUMNS}
            "
        ))
        .bind(screening.movie_id.get())
        .bind(to_millis(screening.starts_at))
        .bind(i64::from(screening.hall_number))
        .bind(money_to_sql(screening.price)?)
        .bind(capacity)
        .bind(capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence("insert screening"))?;
        rows::screening(&row)
    }
}

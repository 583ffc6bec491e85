//! Table definitions, applied idempotently on connect.
//!
//! Timestamps are unix milliseconds and money is minor units, both as
//! INTEGER, so ordering and arithmetic happen in SQL without parsing.

pub(crate) const STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS movies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        genre TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL,
        rating REAL NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS screenings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        movie_id INTEGER NOT NULL REFERENCES movies(id),
        starts_at INTEGER NOT NULL,
        hall_number INTEGER NOT NULL,
        price_minor INTEGER NOT NULL,
        capacity INTEGER NOT NULL,
        available_seats INTEGER NOT NULL,
        CHECK (available_seats >= 0 AND available_seats <= capacity)
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_screenings_movie_start ON screenings(movie_id, starts_at)",
    r"
    CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        screening_id INTEGER NOT NULL REFERENCES screenings(id),
        customer_name TEXT NOT NULL,
        customer_email TEXT NOT NULL,
        seat_number INTEGER NOT NULL,
        purchased_at INTEGER NOT NULL,
        total_price_minor INTEGER NOT NULL,
        UNIQUE (screening_id, seat_number)
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_tickets_email ON tickets(customer_email)",
];

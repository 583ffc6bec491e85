//! SQLite backend against the shared booking contract.
//!
//! Every test gets its own database file in a temporary directory.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

use cinema_sqlite::{SqliteBookingStore, SqliteOptions};
use cinema_testing::conformance;
use std::sync::Arc;
use tempfile::TempDir;

async fn store() -> (TempDir, Arc<SqliteBookingStore>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("cinema.db").display());
    let store = SqliteBookingStore::connect(&url, &SqliteOptions::default())
        .await
        .expect("connect");
    (dir, Arc::new(store))
}

#[tokio::test]
async fn purchase_counts_down_from_available() {
    let (_dir, store) = store().await;
    conformance::purchase_counts_down_from_available(store).await;
}

#[tokio::test]
async fn insufficient_seats_is_all_or_nothing() {
    let (_dir, store) = store().await;
    conformance::insufficient_seats_is_all_or_nothing(store).await;
}

#[tokio::test]
async fn sequential_purchases_continue_countdown() {
    let (_dir, store) = store().await;
    conformance::sequential_purchases_continue_countdown(store).await;
}

#[tokio::test]
async fn history_is_most_recent_first() {
    let (_dir, store) = store().await;
    conformance::history_is_most_recent_first(store).await;
}

#[tokio::test]
async fn available_movies_excludes_past_and_sold_out() {
    let (_dir, store) = store().await;
    conformance::available_movies_excludes_past_and_sold_out(store).await;
}

#[tokio::test]
async fn rejects_unknown_and_invalid_requests() {
    let (_dir, store) = store().await;
    conformance::rejects_unknown_and_invalid_requests(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_fill_exactly() {
    let (_dir, store) = store().await;
    conformance::concurrent_purchases_fill_exactly(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_oversubscription_never_oversells() {
    let (_dir, store) = store().await;
    conformance::concurrent_oversubscription_never_oversells(store).await;
}

#[tokio::test]
async fn hall_utilization_matches_tickets() {
    let (_dir, store) = store().await;
    conformance::hall_utilization_matches_tickets(store).await;
}

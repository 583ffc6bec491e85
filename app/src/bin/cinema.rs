//! Cinema Booking Runner
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Opens the configured backend (in-memory or SQLite)
//! - Seeds the sample catalog unless it already exists
//! - Runs the load experiment and prints the report as JSON
//!
//! # Usage
//!
//! ```bash
//! # In-memory
//! cargo run --bin cinema
//!
//! # SQLite, reproducible plan
//! CINEMA_BACKEND=sqlite DATABASE_URL=sqlite://cinema.db EXPERIMENT_SEED=42 cargo run --bin cinema
//! ```

use anyhow::Context;
use chrono::Utc;
use cinema_app::{Backend, Config, run_experiment};
use cinema_core::api::BookingService;
use cinema_core::environment::SystemClock;
use cinema_core::memory::InMemoryStore;
use cinema_core::seed::seed_sample_catalog;
use cinema_core::store::{BookingStore, CatalogSeeder};
use cinema_sqlite::SqliteBookingStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cinema=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🎬 Starting cinema booking experiment...");

    let config = Config::from_env();
    tracing::info!(backend = ?config.backend, "Configuration loaded");

    match config.backend {
        Backend::Memory => run(Arc::new(InMemoryStore::new()), &config).await,
        Backend::Sqlite => {
            let store = SqliteBookingStore::connect(&config.database.url, &config.sqlite_options())
                .await
                .with_context(|| format!("opening {}", config.database.url))?;
            let store = Arc::new(store);
            let result = run(Arc::clone(&store), &config).await;
            store.close().await;
            result
        }
    }
}

async fn run<S>(store: Arc<S>, config: &Config) -> anyhow::Result<()>
where
    S: BookingStore + CatalogSeeder + 'static,
{
    let seeded = seed_sample_catalog(store.as_ref(), Utc::now(), &config.catalog_options())
        .await
        .context("seeding sample catalog")?;
    tracing::info!(outcome = ?seeded, "✓ Catalog ready");

    let service =
        BookingService::with_environment(store, Arc::new(SystemClock), config.retry_policy());
    let report = run_experiment(&service, &config.experiment).await?;

    for hall in &report.halls {
        tracing::info!(
            hall = hall.hall_number,
            utilization = format!("{:.1}%", hall.utilization_percent),
            "Hall utilization"
        );
    }
    tracing::info!(
        movies = report.movies,
        screenings = report.screenings,
        tickets_sold = report.tickets_sold,
        "🎬 Experiment complete"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

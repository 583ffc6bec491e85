//! Configuration management for the cinema runner.
//!
//! Loads configuration from environment variables with sensible defaults.

use cinema_core::retry::RetryPolicy;
use cinema_core::seed::SampleCatalogOptions;
use cinema_core::Capacity;
use cinema_sqlite::SqliteOptions;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Which store the runner uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process memory; nothing survives a restart
    Memory,
    /// SQLite file at `database.url`
    Sqlite,
}

impl Backend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend
    pub backend: Backend,
    /// SQLite configuration (ignored for the memory backend)
    pub database: DatabaseConfig,
    /// Sample catalog configuration
    pub catalog: CatalogConfig,
    /// Purchase retry configuration
    pub purchase: PurchaseConfig,
    /// Load experiment configuration
    pub experiment: ExperimentConfig,
}

/// SQLite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u64,
}

/// Sample catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Seats per seeded screening
    pub seat_capacity: u32,
    /// Days of seeded screenings
    pub seed_days: u32,
}

/// Purchase retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseConfig {
    /// Retries after a persistence failure
    pub max_retries: usize,
    /// First backoff delay in milliseconds
    pub retry_initial_ms: u64,
}

/// Load experiment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Available-movie lookups in the browse phase
    pub browse_lookups: usize,
    /// Single-seat purchases in the purchase phase
    pub purchases: usize,
    /// History lookups in the history phase
    pub history_lookups: usize,
    /// Concurrent mixed operations
    pub iterations: usize,
    /// Seed for the random choices; random when unset
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            browse_lookups: 1000,
            purchases: 100,
            history_lookups: 100,
            iterations: 500,
            seed: None,
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key-value source.
    ///
    /// Missing or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend = match lookup("CINEMA_BACKEND") {
            None => Backend::Memory,
            Some(value) => Backend::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown CINEMA_BACKEND, using memory");
                Backend::Memory
            }),
        };
        let defaults = ExperimentConfig::default();

        Self {
            backend,
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://cinema.db".to_string()),
                max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 5),
                busy_timeout_ms: parsed(&lookup, "DATABASE_BUSY_TIMEOUT_MS", 5000),
            },
            catalog: CatalogConfig {
                seat_capacity: parsed(&lookup, "CINEMA_SEAT_CAPACITY", Capacity::STANDARD.value()),
                seed_days: parsed(&lookup, "CINEMA_SEED_DAYS", 7),
            },
            purchase: PurchaseConfig {
                max_retries: parsed(&lookup, "PURCHASE_MAX_RETRIES", 3),
                retry_initial_ms: parsed(&lookup, "PURCHASE_RETRY_INITIAL_MS", 20),
            },
            experiment: ExperimentConfig {
                iterations: parsed(&lookup, "EXPERIMENT_ITERATIONS", defaults.iterations),
                seed: lookup("EXPERIMENT_SEED").and_then(|s| s.parse().ok()),
                ..defaults
            },
        }
    }

    /// Pool settings for the SQLite backend.
    #[must_use]
    pub const fn sqlite_options(&self) -> SqliteOptions {
        SqliteOptions {
            max_connections: self.database.max_connections,
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
        }
    }

    /// Catalog shape for seeding.
    #[must_use]
    pub const fn catalog_options(&self) -> SampleCatalogOptions {
        SampleCatalogOptions {
            days: self.catalog.seed_days,
            capacity: Capacity::new(self.catalog.seat_capacity),
        }
    }

    /// Backoff for purchase persistence failures.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.purchase.max_retries)
            .with_initial_delay(Duration::from_millis(self.purchase.retry_initial_ms))
    }
}

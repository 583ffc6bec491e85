//! Load experiment over a seeded catalog.
//!
//! Four phases run against one [`BookingService`]:
//!
//! 1. repeated available-movie lookups
//! 2. single-seat purchases on random screenings among the first 50
//! 3. history lookups for the phase 2 customers
//! 4. a concurrent mix of 40% browsing, 40% buying among the first 20
//!    screenings and 20% history lookups, one tokio task per operation
//!
//! Random choices are drawn up front from a seedable RNG, so a fixed seed
//! replays the same plan.

use crate::config::ExperimentConfig;
use cinema_core::api::BookingService;
use cinema_core::store::BookingStore;
use cinema_core::{HallUtilization, ScreeningId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::{Duration, Instant};

const PURCHASE_POOL: usize = 50;
const MIXED_PURCHASE_POOL: usize = 20;
const HISTORY_CUSTOMERS: usize = 50;

/// Timing and counts of one phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    /// Operations executed
    pub operations: usize,
    /// Purchases that issued tickets
    pub successful_purchases: usize,
    /// Wall-clock time in milliseconds
    pub elapsed_ms: f64,
}

impl PhaseReport {
    fn new(operations: usize, successful_purchases: usize, elapsed: Duration) -> Self {
        Self {
            operations,
            successful_purchases,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Seat usage of one hall.
#[derive(Debug, Clone, Serialize)]
pub struct HallReport {
    /// Hall number
    pub hall_number: u32,
    /// Seats sold across the hall's screenings
    pub sold_seats: u64,
    /// Seats offered across the hall's screenings
    pub total_seats: u64,
    /// Sold share in percent
    pub utilization_percent: f64,
}

impl From<HallUtilization> for HallReport {
    fn from(hall: HallUtilization) -> Self {
        Self {
            hall_number: hall.hall_number,
            sold_seats: hall.sold_seats,
            total_seats: hall.total_seats,
            utilization_percent: hall.percent(),
        }
    }
}

/// Outcome of [`run_experiment`].
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Phase 1: available-movie lookups
    pub browse: PhaseReport,
    /// Phase 2: sequential purchases
    pub purchase: PhaseReport,
    /// Phase 3: history lookups
    pub history: PhaseReport,
    /// Phase 4: concurrent mixed operations
    pub mixed: PhaseReport,
    /// Movies in the catalog
    pub movies: usize,
    /// Screenings in the catalog
    pub screenings: usize,
    /// Tickets issued across every screening
    pub tickets_sold: u64,
    /// Per-hall utilization, by hall number
    pub halls: Vec<HallReport>,
}

#[derive(Debug, Clone, Copy)]
enum MixedOp {
    Browse,
    Buy { screening_id: ScreeningId },
    History { customer: usize },
}

fn plan_mixed(rng: &mut StdRng, iterations: usize, screenings: &[ScreeningId]) -> Vec<MixedOp> {
    (0..iterations)
        .map(|_| {
            let roll: f64 = rng.r#gen();
            if roll < 0.4 || screenings.is_empty() {
                MixedOp::Browse
            } else if roll < 0.8 {
                MixedOp::Buy {
                    screening_id: screenings[rng.gen_range(0..screenings.len())],
                }
            } else {
                MixedOp::History {
                    customer: rng.gen_range(1..=HISTORY_CUSTOMERS),
                }
            }
        })
        .collect()
}

/// Run the four phases and collect statistics.
///
/// # Errors
///
/// Returns the first read-path failure. Failed purchases are counted, not
/// returned.
#[tracing::instrument(skip_all, fields(iterations = config.iterations))]
pub async fn run_experiment<S>(
    service: &BookingService<S>,
    config: &ExperimentConfig,
) -> anyhow::Result<ExperimentReport>
where
    S: BookingStore + 'static,
{
    let mut rng = config
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    let screening_ids: Vec<ScreeningId> = service
        .store()
        .list_screenings()
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();

    // Phase 1
    let started = Instant::now();
    for _ in 0..config.browse_lookups {
        service.list_available_movies().await?;
    }
    let browse = PhaseReport::new(config.browse_lookups, 0, started.elapsed());
    tracing::info!(lookups = browse.operations, elapsed_ms = browse.elapsed_ms, "Browse phase done");

    // Phase 2
    let pool = &screening_ids[..screening_ids.len().min(PURCHASE_POOL)];
    let started = Instant::now();
    let mut bought = 0;
    if !pool.is_empty() {
        for i in 0..config.purchases {
            let screening_id = pool[rng.gen_range(0..pool.len())];
            let outcome = service
                .purchase(
                    screening_id,
                    &format!("Customer{i}"),
                    &format!("customer{i}@test.com"),
                    1,
                )
                .await;
            if outcome.is_success() {
                bought += 1;
            }
        }
    }
    let purchase = PhaseReport::new(config.purchases, bought, started.elapsed());
    tracing::info!(
        purchases = purchase.operations,
        succeeded = purchase.successful_purchases,
        elapsed_ms = purchase.elapsed_ms,
        "Purchase phase done"
    );

    // Phase 3
    let started = Instant::now();
    for i in 0..config.history_lookups {
        service.get_history(&format!("customer{i}@test.com")).await?;
    }
    let history = PhaseReport::new(config.history_lookups, 0, started.elapsed());
    tracing::info!(lookups = history.operations, elapsed_ms = history.elapsed_ms, "History phase done");

    // Phase 4
    let mixed_pool = &screening_ids[..screening_ids.len().min(MIXED_PURCHASE_POOL)];
    let plan = plan_mixed(&mut rng, config.iterations, mixed_pool);
    let mixed = run_mixed(service, plan).await?;
    tracing::info!(
        operations = mixed.operations,
        purchases_succeeded = mixed.successful_purchases,
        elapsed_ms = mixed.elapsed_ms,
        "Mixed phase done"
    );

    let movies = service.store().list_movies().await?.len();
    let halls: Vec<HallReport> = service
        .hall_utilization()
        .await?
        .into_iter()
        .map(HallReport::from)
        .collect();
    let tickets_sold = halls.iter().map(|h| h.sold_seats).sum();

    Ok(ExperimentReport {
        browse,
        purchase,
        history,
        mixed,
        movies,
        screenings: screening_ids.len(),
        tickets_sold,
        halls,
    })
}

async fn run_mixed<S>(service: &BookingService<S>, plan: Vec<MixedOp>) -> anyhow::Result<PhaseReport>
where
    S: BookingStore + 'static,
{
    let operations = plan.len();
    let started = Instant::now();

    let handles: Vec<_> = plan
        .into_iter()
        .enumerate()
        .map(|(i, op)| {
            let service = service.clone();
            tokio::spawn(async move {
                match op {
                    MixedOp::Browse => service.list_available_movies().await.map(|_| false),
                    MixedOp::Buy { screening_id } => Ok(service
                        .purchase(
                            screening_id,
                            &format!("LoadCustomer{i}"),
                            &format!("load{i}@test.com"),
                            1,
                        )
                        .await
                        .is_success()),
                    MixedOp::History { customer } => service
                        .get_history(&format!("customer{customer}@test.com"))
                        .await
                        .map(|_| false),
                }
            })
        })
        .collect();

    let mut bought = 0;
    for result in futures::future::join_all(handles).await {
        if result?? {
            bought += 1;
        }
    }

    Ok(PhaseReport::new(operations, bought, started.elapsed()))
}

pub mod app_config;
pub mod barrier;
pub mod cli;
pub mod client;
pub mod exit_codes;
pub mod population;
pub mod runner;
pub mod summary;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;
use vacation_order::{audit, teardown, ManagerError, ResourceManager};

pub use app_config::{Config, Overrides, WorkloadConfig, WorkloadError};
pub use barrier::Barrier;
pub use client::{select_action, Action, Client, ClientParams, ClientStats};
pub use population::populate;
pub use runner::{run_clients, RunOutcome};
pub use summary::RunSummary;

/// Populate a fresh manager, run the clients, audit and optionally tear down.
///
/// Only population can fail outright; everything after the run is reported
/// through the returned summary.
pub fn execute(config: &Config, dismantle: bool) -> Result<RunSummary, ManagerError> {
    let workload = config.workload;
    let run_id = Uuid::new_v4();
    info!(%run_id, ?workload, seed = config.seed, "Initializing manager");

    let manager = ResourceManager::new();
    let tables_before = populate(&manager, workload.relations, u64::from(config.seed))?;

    let started_at = Utc::now();
    let outcome = run_clients(&manager, &workload, config.seed);
    let tables_after = manager.table_sizes();

    let report = audit(&manager);
    if !report.is_clean() {
        error!(violations = report.violations.len(), "audit failed");
    }

    let (removed, teardown_error) = if dismantle {
        match teardown(&manager, i64::from(workload.relations), workload.query_range()) {
            Ok(removed) => (Some(removed), None),
            Err(e) => {
                error!("teardown failed: {}", e);
                (None, Some(e.to_string()))
            }
        }
    } else {
        (None, None)
    };

    Ok(RunSummary {
        run_id,
        started_at,
        config: config.clone(),
        query_range: workload.query_range(),
        transactions_per_client: workload.transactions_per_client(),
        elapsed_ms: outcome.elapsed.as_millis() as u64,
        totals: outcome.totals,
        tables_before,
        tables_after,
        barrier_clear: outcome.barrier_clear,
        audit: report,
        removed,
        teardown_error,
    })
}

use std::time::{Duration, Instant};

use tracing::{info, info_span};
use vacation_order::ResourceManager;

use crate::app_config::WorkloadConfig;
use crate::barrier::Barrier;
use crate::client::{Client, ClientParams, ClientStats};

/// Barrier rounds per run: start and stop.
const ROUNDS: u64 = 2;

/// What came back from one timed run of all clients.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub elapsed: Duration,
    pub per_client: Vec<ClientStats>,
    pub totals: ClientStats,
    /// Both barrier rounds completed and no party was left parked.
    pub barrier_clear: bool,
}

/// Run `workload.clients` threads against `manager` and time them.
///
/// The calling thread joins the barrier as an extra party: the clock
/// starts when everyone has met the first time and stops when everyone
/// meets again. Client `i` seeds its generator with `seed + i`.
pub fn run_clients(manager: &ResourceManager, workload: &WorkloadConfig, seed: u32) -> RunOutcome {
    let params = ClientParams::from_workload(workload);
    let clients = workload.clients as usize;
    let barrier = Barrier::new(clients + 1);

    let _span = info_span!("run", clients, operations = params.num_operations).entered();
    info!("Starting {} clients", clients);

    let (elapsed, per_client) = std::thread::scope(|s| {
        let handles: Vec<_> = (0..clients)
            .map(|i| {
                let barrier = &barrier;
                let client = Client::new(i, manager, params, u64::from(seed) + i as u64);
                s.spawn(move || client.run(barrier))
            })
            .collect();

        barrier.wait();
        let start = Instant::now();
        barrier.wait();
        let elapsed = start.elapsed();

        let per_client: Vec<ClientStats> = handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(stats) => stats,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect();
        (elapsed, per_client)
    });

    let totals: ClientStats = per_client.iter().sum();
    info!(elapsed_ms = elapsed.as_millis() as u64, ?totals, "clients done");

    RunOutcome {
        elapsed,
        per_client,
        totals,
        barrier_clear: barrier.is_clear() && barrier.generation() == ROUNDS,
    }
}

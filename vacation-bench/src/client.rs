use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use vacation_core::{CustomerId, RecordId, ReservationKind};
use vacation_order::ResourceManager;

use crate::app_config::WorkloadConfig;
use crate::barrier::Barrier;

/// Units added or withdrawn by one table update.
pub const UPDATE_UNITS: i64 = 100;

/// The three transaction shapes a client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MakeReservation,
    DeleteCustomer,
    UpdateTables,
}

/// Map a draw `r` in `0..100` onto an action.
///
/// Below `percent_user` is a reservation; the remainder is split between
/// customer deletion (odd `r`) and table updates (even `r`).
pub fn select_action(r: u32, percent_user: u32) -> Action {
    if r < percent_user {
        Action::MakeReservation
    } else if r & 1 == 1 {
        Action::DeleteCustomer
    } else {
        Action::UpdateTables
    }
}

/// Per-client slice of the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientParams {
    pub num_operations: u64,
    pub queries_per_transaction: u32,
    pub query_range: i64,
    pub percent_user: u32,
}

impl ClientParams {
    pub fn from_workload(workload: &WorkloadConfig) -> Self {
        Self {
            num_operations: workload.transactions_per_client(),
            queries_per_transaction: workload.queries_per_transaction.max(1),
            query_range: workload.query_range().max(1),
            percent_user: workload.percent_user,
        }
    }
}

/// What one client did, and how much of it applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    pub transactions: u64,
    pub reservation_transactions: u64,
    pub queries: u64,
    pub customers_added: u64,
    pub reservations_attempted: u64,
    pub reservations_made: u64,
    pub delete_transactions: u64,
    pub customers_deleted: u64,
    pub update_transactions: u64,
    pub updates_attempted: u64,
    pub updates_applied: u64,
}

impl ClientStats {
    pub fn merge(&mut self, other: &ClientStats) {
        self.transactions += other.transactions;
        self.reservation_transactions += other.reservation_transactions;
        self.queries += other.queries;
        self.customers_added += other.customers_added;
        self.reservations_attempted += other.reservations_attempted;
        self.reservations_made += other.reservations_made;
        self.delete_transactions += other.delete_transactions;
        self.customers_deleted += other.customers_deleted;
        self.update_transactions += other.update_transactions;
        self.updates_attempted += other.updates_attempted;
        self.updates_applied += other.updates_applied;
    }
}

impl<'a> std::iter::Sum<&'a ClientStats> for ClientStats {
    fn sum<I: Iterator<Item = &'a ClientStats>>(iter: I) -> Self {
        iter.fold(ClientStats::default(), |mut acc, s| {
            acc.merge(s);
            acc
        })
    }
}

/// One simulated travel agent hammering the shared manager.
///
/// A failed call is never retried: it just means the randomly chosen
/// transaction did not apply.
pub struct Client<'a> {
    id: usize,
    manager: &'a ResourceManager,
    rng: StdRng,
    params: ClientParams,
    stats: ClientStats,
}

impl<'a> Client<'a> {
    pub fn new(id: usize, manager: &'a ResourceManager, params: ClientParams, seed: u64) -> Self {
        Self {
            id,
            manager,
            rng: StdRng::seed_from_u64(seed),
            params,
            stats: ClientStats::default(),
        }
    }

    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    /// Meet the other parties, run the whole slice, meet them again.
    pub fn run(mut self, barrier: &Barrier) -> ClientStats {
        barrier.wait();
        self.run_operations();
        barrier.wait();
        self.stats
    }

    pub fn run_operations(&mut self) {
        debug!(client = self.id, operations = self.params.num_operations, "client started");
        for _ in 0..self.params.num_operations {
            self.step();
        }
        debug!(client = self.id, stats = ?self.stats, "client finished");
    }

    /// Draw and execute a single transaction.
    pub fn step(&mut self) -> Action {
        let r = self.rng.gen_range(0..100);
        let action = select_action(r, self.params.percent_user);

        match action {
            Action::MakeReservation => self.make_reservation(),
            Action::DeleteCustomer => self.delete_customer(),
            Action::UpdateTables => self.update_tables(),
        }
        self.stats.transactions += 1;
        action
    }

    fn random_id(&mut self) -> RecordId {
        self.rng.gen_range(1..=self.params.query_range)
    }

    fn random_kind(&mut self) -> ReservationKind {
        ReservationKind::from_index(self.rng.gen_range(0..ReservationKind::COUNT))
    }

    fn batch_size(&mut self) -> u32 {
        self.rng.gen_range(1..=self.params.queries_per_transaction)
    }

    /// Look at a handful of resources, then book the priciest of each kind.
    fn make_reservation(&mut self) {
        self.stats.reservation_transactions += 1;

        let num_query = self.batch_size();
        let customer_id: CustomerId = self.random_id();
        let mut best: [Option<(i64, RecordId)>; ReservationKind::COUNT] =
            [None; ReservationKind::COUNT];

        for _ in 0..num_query {
            let kind = self.random_kind();
            let id = self.random_id();
            self.stats.queries += 1;

            if self.manager.query_free(kind, id).is_none() {
                continue;
            }
            let Some(price) = self.manager.query_price(kind, id) else {
                continue;
            };

            let slot = &mut best[kind.index()];
            if slot.map_or(true, |(max, _)| price > max) {
                *slot = Some((price, id));
            }
        }

        if best.iter().all(Option::is_none) {
            return;
        }
        if self.manager.add_customer(customer_id).is_ok() {
            self.stats.customers_added += 1;
        }

        for kind in ReservationKind::ALL {
            let Some((_, id)) = best[kind.index()] else {
                continue;
            };
            self.stats.reservations_attempted += 1;
            match self.manager.reserve(kind, customer_id, id) {
                Ok(()) => self.stats.reservations_made += 1,
                Err(e) => trace!(
                    client = self.id,
                    customer = customer_id,
                    %kind,
                    id,
                    "reserve skipped: {}",
                    e
                ),
            }
        }
    }

    fn delete_customer(&mut self) {
        self.stats.delete_transactions += 1;

        let customer_id = self.random_id();
        if self.manager.query_customer_bill(customer_id).is_none() {
            return;
        }
        match self.manager.delete_customer(customer_id) {
            Ok(()) => self.stats.customers_deleted += 1,
            Err(e) => trace!(client = self.id, customer = customer_id, "delete skipped: {}", e),
        }
    }

    /// Restock or withdraw a batch of random inventory records.
    fn update_tables(&mut self) {
        self.stats.update_transactions += 1;

        let num_update = self.batch_size();
        for _ in 0..num_update {
            let kind = self.random_kind();
            let id = self.random_id();
            let restock = self.rng.gen_bool(0.5);

            let result = if restock {
                let price = self.rng.gen_range(0..5) * 10 + 50;
                self.manager.add_resource(kind, id, UPDATE_UNITS, price)
            } else if kind == ReservationKind::Flight {
                self.manager.delete_flight(id)
            } else {
                self.manager.delete_resource(kind, id, UPDATE_UNITS)
            };

            self.stats.updates_attempted += 1;
            match result {
                Ok(()) => self.stats.updates_applied += 1,
                Err(e) => trace!(client = self.id, %kind, id, "update skipped: {}", e),
            }
        }
    }
}

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vacation_order::{AuditReport, TableSizes};

use crate::app_config::Config;
use crate::client::ClientStats;

/// Everything reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub config: Config,
    pub query_range: i64,
    pub transactions_per_client: u64,
    pub elapsed_ms: u64,
    pub totals: ClientStats,
    pub tables_before: TableSizes,
    pub tables_after: TableSizes,
    pub barrier_clear: bool,
    pub audit: AuditReport,
    /// Rows removed by the teardown, if it ran and succeeded.
    pub removed: Option<TableSizes>,
    pub teardown_error: Option<String>,
}

impl RunSummary {
    /// The run is good when the audit is clean, no thread is left in the
    /// barrier and the teardown (if any) went through.
    pub fn passed(&self) -> bool {
        self.audit.is_clean() && self.barrier_clear && self.teardown_error.is_none()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain text report, ending with the `TIME=` line.
    pub fn render(&self) -> String {
        let w = &self.config.workload;
        let t = &self.totals;
        let mut out = String::new();

        let _ = writeln!(out, "Run {} started {}", self.run_id, self.started_at.to_rfc3339());
        let _ = writeln!(out, "Clients              = {}", w.clients);
        let _ = writeln!(out, "Transactions         = {}", w.transactions);
        let _ = writeln!(out, "Relations            = {}", w.relations);
        let _ = writeln!(out, "Query percent        = {}", w.percent_queried);
        let _ = writeln!(out, "Queries/transaction  = {}", w.queries_per_transaction);
        let _ = writeln!(out, "User percent         = {}", w.percent_user);
        let _ = writeln!(out, "Query range          = {}", self.query_range);
        let _ = writeln!(out, "Seed                 = {}", self.config.seed);
        let _ = writeln!(
            out,
            "Reservations         = {}/{} made in {} transactions",
            t.reservations_made, t.reservations_attempted, t.reservation_transactions
        );
        let _ = writeln!(
            out,
            "Customer deletions   = {} in {} transactions",
            t.customers_deleted, t.delete_transactions
        );
        let _ = writeln!(
            out,
            "Table updates        = {}/{} applied in {} transactions",
            t.updates_applied, t.updates_attempted, t.update_transactions
        );
        let _ = writeln!(
            out,
            "Tables after run     = cars {} flights {} rooms {} customers {}",
            self.tables_after.cars,
            self.tables_after.flights,
            self.tables_after.rooms,
            self.tables_after.customers
        );

        if self.audit.is_clean() {
            let _ = writeln!(
                out,
                "Audit                = clean ({} records, {} customers)",
                self.audit.reservations_checked, self.audit.customers_checked
            );
        } else {
            let _ = writeln!(
                out,
                "Audit                = {} violations",
                self.audit.violations.len()
            );
            for violation in &self.audit.violations {
                let _ = writeln!(out, "  {:?}", violation);
            }
        }
        if !self.barrier_clear {
            let _ = writeln!(out, "Barrier              = parties still waiting");
        }
        match (&self.removed, &self.teardown_error) {
            (_, Some(err)) => {
                let _ = writeln!(out, "Teardown             = failed: {}", err);
            }
            (Some(removed), None) => {
                let _ = writeln!(
                    out,
                    "Teardown             = removed cars {} flights {} rooms {} customers {}",
                    removed.cars, removed.flights, removed.rooms, removed.customers
                );
            }
            (None, None) => {
                let _ = writeln!(out, "Teardown             = skipped");
            }
        }

        let _ = writeln!(out, "TIME={}", self.elapsed_ms as f64 / 1000.0);
        out
    }
}

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};
use vacation_catalog::Inventory;
use vacation_core::{CustomerId, RecordId, ReservationKind};

use crate::manager::{ManagerError, ResourceManager, TableSizes};

/// A broken invariant found by [`audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    /// Counters do not add up or went negative.
    InconsistentInventory {
        kind: ReservationKind,
        id: RecordId,
        inventory: Inventory,
    },
    /// A customer holds a reservation whose inventory record is gone.
    DanglingReservation {
        customer: CustomerId,
        kind: ReservationKind,
        resource_id: RecordId,
    },
    /// A customer holds a reservation on a record with nothing in use.
    UnbackedReservation {
        customer: CustomerId,
        kind: ReservationKind,
        resource_id: RecordId,
    },
    /// Units in use differ from the number of customers holding them.
    UsageMismatch {
        kind: ReservationKind,
        id: RecordId,
        num_used: i64,
        held: i64,
    },
    /// A customer list carries the same `(kind, id)` twice.
    DuplicateReservation {
        customer: CustomerId,
        kind: ReservationKind,
        resource_id: RecordId,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub reservations_checked: usize,
    pub customers_checked: usize,
    pub entries_checked: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every record and every cross-record invariant.
///
/// Non-destructive. The usage-count comparison is only meaningful while
/// no client is running; call it after the workload has stopped.
pub fn audit(manager: &ResourceManager) -> AuditReport {
    let mut report = AuditReport::default();
    let mut held: HashMap<(ReservationKind, RecordId), i64> = HashMap::new();

    for (customer, account) in manager.customers().entries() {
        report.customers_checked += 1;
        let reservations = account.reservations();

        for pair in reservations.windows(2) {
            if pair[0].key() >= pair[1].key() {
                report.violations.push(Violation::DuplicateReservation {
                    customer,
                    kind: pair[1].kind,
                    resource_id: pair[1].resource_id,
                });
            }
        }

        for info in reservations {
            report.entries_checked += 1;
            *held.entry(info.key()).or_insert(0) += 1;

            match manager.inventory(info.kind, info.resource_id) {
                None => report.violations.push(Violation::DanglingReservation {
                    customer,
                    kind: info.kind,
                    resource_id: info.resource_id,
                }),
                Some(inventory) if inventory.num_used < 1 => {
                    report.violations.push(Violation::UnbackedReservation {
                        customer,
                        kind: info.kind,
                        resource_id: info.resource_id,
                    })
                }
                Some(_) => {}
            }
        }
    }

    for kind in ReservationKind::ALL {
        for (id, reservation) in manager.table(kind).entries() {
            report.reservations_checked += 1;
            let inventory = reservation.snapshot();

            if !inventory.is_consistent() {
                report.violations.push(Violation::InconsistentInventory { kind, id, inventory });
            }

            let holders = held.get(&(kind, id)).copied().unwrap_or(0);
            if holders != inventory.num_used {
                report.violations.push(Violation::UsageMismatch {
                    kind,
                    id,
                    num_used: inventory.num_used,
                    held: holders,
                });
            }
        }
    }

    for violation in &report.violations {
        warn!(?violation, "audit violation");
    }
    info!(
        reservations = report.reservations_checked,
        customers = report.customers_checked,
        entries = report.entries_checked,
        violations = report.violations.len(),
        "audit complete"
    );
    report
}

/// Dismantle the tables id by id, failing on the first inconsistency.
///
/// Removes customers `1..=query_range + 1`, then for every inventory id in
/// `1..=relations` that is present, re-adds zero units at price zero (which
/// must succeed on any well-formed record) and removes the row. Returns the
/// number of rows removed from each table.
pub fn teardown(
    manager: &ResourceManager,
    relations: i64,
    query_range: i64,
) -> Result<TableSizes, AuditError> {
    let mut removed = TableSizes::default();

    let customers = manager.customers();
    for id in 1..=query_range + 1 {
        if customers.contains(id) {
            customers
                .remove(id)
                .map_err(|_| AuditError::CustomerRemoval(id))?;
            removed.customers += 1;
        }
    }

    for kind in ReservationKind::ALL {
        let table = manager.table(kind);
        for id in 1..=relations {
            if !table.contains(id) {
                continue;
            }
            manager
                .add_resource(kind, id, 0, 0)
                .map_err(|source| AuditError::Restock { kind, id, source })?;
            table
                .remove(id)
                .map_err(|_| AuditError::Removal { kind, id })?;

            match kind {
                ReservationKind::Car => removed.cars += 1,
                ReservationKind::Flight => removed.flights += 1,
                ReservationKind::Room => removed.rooms += 1,
            }
        }
    }

    info!(?removed, "tables dismantled");
    Ok(removed)
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to remove customer {0}")]
    CustomerRemoval(CustomerId),

    #[error("Failed to restock {kind} {id}: {source}")]
    Restock {
        kind: ReservationKind,
        id: RecordId,
        source: ManagerError,
    },

    #[error("Failed to remove {kind} {id}")]
    Removal { kind: ReservationKind, id: RecordId },
}

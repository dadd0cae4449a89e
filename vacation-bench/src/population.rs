use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;
use vacation_core::{RecordId, ReservationKind};
use vacation_order::{ManagerError, ResourceManager, TableSizes};

#[derive(Debug, Clone, Copy)]
enum Relation {
    Inventory(ReservationKind),
    Customers,
}

const RELATIONS: [Relation; 4] = [
    Relation::Inventory(ReservationKind::Car),
    Relation::Inventory(ReservationKind::Flight),
    Relation::Inventory(ReservationKind::Room),
    Relation::Customers,
];

/// Fill every table with ids `1..=relations`, inserted in shuffled order.
///
/// Inventory rows get `(r % 5 + 1) * 100` units at `(r % 5) * 10 + 50`,
/// with a fresh draw `r` for each. Customers start with no reservations.
pub fn populate(
    manager: &ResourceManager,
    relations: u32,
    seed: u64,
) -> Result<TableSizes, ManagerError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ids: Vec<RecordId> = (1..=i64::from(relations)).collect();

    for relation in RELATIONS {
        ids.shuffle(&mut rng);
        for &id in &ids {
            match relation {
                Relation::Inventory(kind) => {
                    let count = (rng.gen_range(0..5) + 1) * 100;
                    let price = rng.gen_range(0..5) * 10 + 50;
                    manager.add_resource(kind, id, count, price)?;
                }
                Relation::Customers => manager.add_customer(id)?,
            }
        }
    }

    let sizes = manager.table_sizes();
    info!(?sizes, "tables populated");
    Ok(sizes)
}

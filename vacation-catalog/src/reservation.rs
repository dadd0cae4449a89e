use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use vacation_core::{FailureClass, RecordId};

/// Counters and price of one inventory record, as observed under its lock.
///
/// `num_used + num_free == num_total` and all three are non-negative at
/// every point another thread can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub num_used: i64,
    pub num_free: i64,
    pub num_total: i64,
    pub price: i64,
}

impl Inventory {
    pub fn is_consistent(&self) -> bool {
        self.num_used >= 0
            && self.num_free >= 0
            && self.num_total >= 0
            && self.num_used.checked_add(self.num_free) == Some(self.num_total)
    }
}

struct ReservationState {
    inventory: Inventory,
    /// Set once the record has been unlinked from its table.
    retired: bool,
}

/// Inventory record for a single car, flight or room id.
///
/// Every operation takes the record lock once, validates, and either
/// mutates completely or returns an error with the record untouched.
pub struct Reservation {
    id: RecordId,
    state: Mutex<ReservationState>,
}

impl Reservation {
    /// Create a record with `num_total` free units.
    pub fn new(id: RecordId, num_total: i64, price: i64) -> Result<Self, InventoryError> {
        if num_total < 1 {
            return Err(InventoryError::InvalidCount(num_total));
        }
        if price < 0 {
            return Err(InventoryError::InvalidPrice(price));
        }

        Ok(Self {
            id,
            state: Mutex::new(ReservationState {
                inventory: Inventory {
                    num_used: 0,
                    num_free: num_total,
                    num_total,
                    price,
                },
                retired: false,
            }),
        })
    }

    /// Current counters and price.
    pub fn snapshot(&self) -> Inventory {
        self.state.lock().inventory
    }

    pub fn num_free(&self) -> i64 {
        self.state.lock().inventory.num_free
    }

    pub fn price(&self) -> i64 {
        self.state.lock().inventory.price
    }

    /// Add `delta` units (remove them if negative).
    ///
    /// Only free units can be withdrawn: fails if the free count would go
    /// negative, or if either count would leave the `i64` range. Returns
    /// the counters after the change.
    pub fn add_to_total(&self, delta: i64) -> Result<Inventory, InventoryError> {
        let mut state = self.state.lock();
        if state.retired {
            return Err(InventoryError::Retired(self.id));
        }

        let inv = &mut state.inventory;
        let overflow = InventoryError::Overflow { id: self.id, delta };
        let num_free = inv.num_free.checked_add(delta).ok_or(overflow.clone())?;
        let num_total = inv.num_total.checked_add(delta).ok_or(overflow)?;
        if num_free < 0 {
            return Err(InventoryError::Overdrawn {
                id: self.id,
                requested: delta.saturating_neg(),
                available: inv.num_free,
            });
        }

        inv.num_free = num_free;
        inv.num_total = num_total;
        Ok(*inv)
    }

    /// Take one free unit. Returns the price the unit was taken at.
    pub fn make_reservation(&self) -> Result<i64, InventoryError> {
        let mut state = self.state.lock();
        let inv = &mut state.inventory;
        if inv.num_free < 1 {
            return Err(InventoryError::SoldOut(self.id));
        }

        inv.num_used += 1;
        inv.num_free -= 1;
        Ok(inv.price)
    }

    /// Give one used unit back.
    pub fn cancel(&self) -> Result<(), InventoryError> {
        let mut state = self.state.lock();
        let inv = &mut state.inventory;
        if inv.num_used < 1 {
            return Err(InventoryError::NothingToCancel(self.id));
        }

        inv.num_used -= 1;
        inv.num_free += 1;
        Ok(())
    }

    pub fn update_price(&self, new_price: i64) -> Result<(), InventoryError> {
        if new_price < 0 {
            return Err(InventoryError::InvalidPrice(new_price));
        }

        self.state.lock().inventory.price = new_price;
        Ok(())
    }

    /// Withdraw every unit at once, provided none is in use.
    ///
    /// The usage check and the withdrawal happen under one lock, so a
    /// concurrent reservation either lands before (and the call fails) or
    /// finds nothing free afterwards.
    pub fn clear_if_unused(&self) -> Result<Inventory, InventoryError> {
        let mut state = self.state.lock();
        if state.retired {
            return Err(InventoryError::Retired(self.id));
        }

        let inv = &mut state.inventory;
        if inv.num_used > 0 {
            return Err(InventoryError::InUse {
                id: self.id,
                used: inv.num_used,
            });
        }

        inv.num_free = 0;
        inv.num_total = 0;
        Ok(*inv)
    }

    /// Mark the record retired if it holds no units at all.
    ///
    /// Meant to run while the owning table is write-locked; once retired
    /// the record refuses new stock so it cannot silently absorb units
    /// after being unlinked.
    pub fn retire_if_empty(&self) -> bool {
        let mut state = self.state.lock();
        if state.inventory.num_total == 0 {
            state.retired = true;
        }
        state.retired
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Reservation")
            .field("id", &self.id)
            .field("inventory", &state.inventory)
            .field("retired", &state.retired)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("Invalid unit count: {0}")]
    InvalidCount(i64),

    #[error("Invalid price: {0}")]
    InvalidPrice(i64),

    #[error("Insufficient free inventory on {id}: requested {requested}, available {available}")]
    Overdrawn {
        id: RecordId,
        requested: i64,
        available: i64,
    },

    #[error("No free units left on {0}")]
    SoldOut(RecordId),

    #[error("No used units to cancel on {0}")]
    NothingToCancel(RecordId),

    #[error("Inventory {id} still has {used} units in use")]
    InUse { id: RecordId, used: i64 },

    #[error("Inventory {0} has been removed from its table")]
    Retired(RecordId),

    #[error("Adding {delta} units to {id} overflows its counters")]
    Overflow { id: RecordId, delta: i64 },
}

impl InventoryError {
    pub fn class(&self) -> FailureClass {
        match self {
            InventoryError::InvalidCount(_)
            | InventoryError::InvalidPrice(_)
            | InventoryError::Overflow { .. } => FailureClass::InvalidArgument,
            InventoryError::Retired(_) => FailureClass::NotFound,
            InventoryError::Overdrawn { .. }
            | InventoryError::SoldOut(_)
            | InventoryError::NothingToCancel(_)
            | InventoryError::InUse { .. } => FailureClass::Precondition,
        }
    }
}

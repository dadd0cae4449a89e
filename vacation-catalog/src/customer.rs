use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use vacation_core::{CustomerId, FailureClass, RecordId, ReservationKind};

/// One unit of inventory held by a customer, at the price it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationInfo {
    pub kind: ReservationKind,
    pub resource_id: RecordId,
    pub price: i64,
}

impl ReservationInfo {
    pub fn new(kind: ReservationKind, resource_id: RecordId, price: i64) -> Self {
        Self { kind, resource_id, price }
    }

    /// Sort and identity key. The price is not part of it.
    pub fn key(&self) -> (ReservationKind, RecordId) {
        (self.kind, self.resource_id)
    }
}

struct Ledger {
    /// Sorted by `(kind, resource_id)`, no duplicate keys.
    reservations: Vec<ReservationInfo>,
    closed: bool,
}

/// A customer and the reservations they currently hold.
pub struct CustomerAccount {
    id: CustomerId,
    ledger: Mutex<Ledger>,
}

impl CustomerAccount {
    pub fn new(id: CustomerId) -> Self {
        Self {
            id,
            ledger: Mutex::new(Ledger {
                reservations: Vec::new(),
                closed: false,
            }),
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    /// Record a newly taken unit. Rejects a second entry for the same
    /// `(kind, resource_id)` and any insert into a closed account.
    pub fn add_reservation_info(
        &self,
        kind: ReservationKind,
        resource_id: RecordId,
        price: i64,
    ) -> Result<(), CustomerError> {
        let mut ledger = self.ledger.lock();
        if ledger.closed {
            return Err(CustomerError::Closed(self.id));
        }

        let info = ReservationInfo::new(kind, resource_id, price);
        match ledger.reservations.binary_search_by_key(&info.key(), ReservationInfo::key) {
            Ok(_) => Err(CustomerError::DuplicateReservation {
                customer: self.id,
                kind,
                resource_id,
            }),
            Err(pos) => {
                ledger.reservations.insert(pos, info);
                Ok(())
            }
        }
    }

    /// Drop the entry for `(kind, resource_id)` and return it.
    pub fn remove_reservation_info(
        &self,
        kind: ReservationKind,
        resource_id: RecordId,
    ) -> Result<ReservationInfo, CustomerError> {
        let mut ledger = self.ledger.lock();
        if ledger.closed {
            return Err(CustomerError::Closed(self.id));
        }

        match ledger
            .reservations
            .binary_search_by_key(&(kind, resource_id), ReservationInfo::key)
        {
            Ok(pos) => Ok(ledger.reservations.remove(pos)),
            Err(_) => Err(CustomerError::NotHeld {
                customer: self.id,
                kind,
                resource_id,
            }),
        }
    }

    /// Total price of everything currently held, saturating at `i64::MAX`.
    pub fn bill(&self) -> i64 {
        self.ledger
            .lock()
            .reservations
            .iter()
            .fold(0_i64, |total, r| total.saturating_add(r.price))
    }

    /// Copy of the held reservations, in `(kind, id)` order.
    pub fn reservations(&self) -> Vec<ReservationInfo> {
        self.ledger.lock().reservations.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.ledger.lock().closed
    }

    /// Close the account and hand back everything it held.
    ///
    /// After this returns no reservation can be added or removed, so the
    /// caller owns the returned entries exclusively. Closing twice yields
    /// an empty list the second time.
    pub fn close(&self) -> Vec<ReservationInfo> {
        let mut ledger = self.ledger.lock();
        ledger.closed = true;
        std::mem::take(&mut ledger.reservations)
    }
}

impl std::fmt::Debug for CustomerAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ledger = self.ledger.lock();
        f.debug_struct("CustomerAccount")
            .field("id", &self.id)
            .field("reservations", &ledger.reservations)
            .field("closed", &ledger.closed)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomerError {
    #[error("Customer {customer} already holds {kind} {resource_id}")]
    DuplicateReservation {
        customer: CustomerId,
        kind: ReservationKind,
        resource_id: RecordId,
    },

    #[error("Customer {customer} holds no {kind} {resource_id}")]
    NotHeld {
        customer: CustomerId,
        kind: ReservationKind,
        resource_id: RecordId,
    },

    #[error("Customer {0} has been deleted")]
    Closed(CustomerId),
}

impl CustomerError {
    pub fn class(&self) -> FailureClass {
        match self {
            CustomerError::DuplicateReservation { .. } => FailureClass::Precondition,
            CustomerError::NotHeld { .. } | CustomerError::Closed(_) => FailureClass::NotFound,
        }
    }
}

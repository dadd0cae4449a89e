use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vacation_catalog::{
    CustomerAccount, CustomerError, Inventory, InventoryError, Reservation, ReservationInfo,
};
use vacation_core::{CustomerId, FailureClass, RecordId, ReservationKind};
use vacation_store::Table;

/// Row counts of the four tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSizes {
    pub cars: usize,
    pub flights: usize,
    pub rooms: usize,
    pub customers: usize,
}

/// The travel reservation store: three inventory tables plus customers.
///
/// Every operation is safe to call from any number of threads. Each one
/// is a sequence of single-record steps, each step atomic under that
/// record's lock; no two record locks are ever held at once. Where a
/// later step fails after an earlier one succeeded, the earlier step is
/// compensated before the error is returned.
pub struct ResourceManager {
    cars: Table<Reservation>,
    flights: Table<Reservation>,
    rooms: Table<Reservation>,
    customers: Table<CustomerAccount>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self {
            cars: Table::new("cars"),
            flights: Table::new("flights"),
            rooms: Table::new("rooms"),
            customers: Table::new("customers"),
        }
    }

    /// The inventory table for `kind`.
    pub fn table(&self, kind: ReservationKind) -> &Table<Reservation> {
        match kind {
            ReservationKind::Car => &self.cars,
            ReservationKind::Flight => &self.flights,
            ReservationKind::Room => &self.rooms,
        }
    }

    pub fn customers(&self) -> &Table<CustomerAccount> {
        &self.customers
    }

    pub fn table_sizes(&self) -> TableSizes {
        TableSizes {
            cars: self.cars.len(),
            flights: self.flights.len(),
            rooms: self.rooms.len(),
            customers: self.customers.len(),
        }
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    /// Add `count` units of `kind` at `price`.
    ///
    /// Creates the record if needed (requires `count >= 1` and
    /// `price >= 0`). On an existing record the price is overwritten when
    /// non-negative; a negative price leaves it as is.
    pub fn add_resource(
        &self,
        kind: ReservationKind,
        id: RecordId,
        count: i64,
        price: i64,
    ) -> Result<(), ManagerError> {
        self.adjust_inventory(kind, id, count, Some(price))
    }

    /// Withdraw `count` free units of `kind`, keeping the price.
    ///
    /// Fails if fewer than `count` units are free. A record whose total
    /// reaches zero is removed from its table.
    pub fn delete_resource(
        &self,
        kind: ReservationKind,
        id: RecordId,
        count: i64,
    ) -> Result<(), ManagerError> {
        if count < 0 {
            return Err(ManagerError::InvalidCount(count));
        }
        self.adjust_inventory(kind, id, -count, None)
    }

    pub fn add_car(&self, id: RecordId, count: i64, price: i64) -> Result<(), ManagerError> {
        self.add_resource(ReservationKind::Car, id, count, price)
    }

    pub fn add_flight(&self, id: RecordId, count: i64, price: i64) -> Result<(), ManagerError> {
        self.add_resource(ReservationKind::Flight, id, count, price)
    }

    pub fn add_room(&self, id: RecordId, count: i64, price: i64) -> Result<(), ManagerError> {
        self.add_resource(ReservationKind::Room, id, count, price)
    }

    pub fn delete_car(&self, id: RecordId, count: i64) -> Result<(), ManagerError> {
        self.delete_resource(ReservationKind::Car, id, count)
    }

    pub fn delete_room(&self, id: RecordId, count: i64) -> Result<(), ManagerError> {
        self.delete_resource(ReservationKind::Room, id, count)
    }

    /// Remove an entire flight. Fails while any seat is reserved.
    pub fn delete_flight(&self, id: RecordId) -> Result<(), ManagerError> {
        let kind = ReservationKind::Flight;
        let flight = self
            .flights
            .get(id)
            .ok_or(ManagerError::ResourceNotFound { kind, id })?;

        flight
            .clear_if_unused()
            .map_err(|source| ManagerError::Inventory { kind, id, source })?;
        self.flights.remove_if(id, |r| r.retire_if_empty());
        Ok(())
    }

    fn adjust_inventory(
        &self,
        kind: ReservationKind,
        id: RecordId,
        delta: i64,
        price: Option<i64>,
    ) -> Result<(), ManagerError> {
        let table = self.table(kind);

        loop {
            let reservation = match table.get(id) {
                Some(reservation) => reservation,
                None => {
                    // Withdrawing from nothing, or adding without a price.
                    let Some(price) = price else {
                        return Err(ManagerError::ResourceNotFound { kind, id });
                    };
                    let record = Reservation::new(id, delta, price)
                        .map_err(|source| ManagerError::Inventory { kind, id, source })?;
                    match table.insert(id, record) {
                        Ok(_) => return Ok(()),
                        // Another client created it first; add to theirs.
                        Err(_) => continue,
                    }
                }
            };

            match reservation.add_to_total(delta) {
                Ok(after) if after.num_total == 0 => {
                    table.remove_if(id, |r| r.retire_if_empty());
                    return Ok(());
                }
                Ok(_) => {
                    if let Some(price) = price.filter(|p| *p >= 0) {
                        reservation
                            .update_price(price)
                            .map_err(|source| ManagerError::Inventory { kind, id, source })?;
                    }
                    return Ok(());
                }
                // Unlinked under us; retry against whatever the table holds now.
                Err(InventoryError::Retired(_)) => continue,
                Err(source) => return Err(ManagerError::Inventory { kind, id, source }),
            }
        }
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub fn add_customer(&self, id: CustomerId) -> Result<(), ManagerError> {
        self.customers
            .insert_with(id, || CustomerAccount::new(id))
            .map(|_| ())
            .map_err(|_| ManagerError::CustomerExists(id))
    }

    /// Delete a customer and cancel everything they hold.
    ///
    /// The account is unlinked first, then closed, so a concurrent
    /// `reserve` that already looked it up can no longer attach to it.
    /// Cancellation is best-effort: inventory that vanished meanwhile is
    /// skipped.
    pub fn delete_customer(&self, id: CustomerId) -> Result<(), ManagerError> {
        let account = self
            .customers
            .remove(id)
            .map_err(|_| ManagerError::CustomerNotFound(id))?;

        for info in account.close() {
            match self.table(info.kind).get(info.resource_id) {
                Some(reservation) => {
                    if let Err(e) = reservation.cancel() {
                        warn!(
                            customer = id,
                            kind = %info.kind,
                            resource = info.resource_id,
                            "cancel on delete failed: {}",
                            e
                        );
                    }
                }
                None => {
                    debug!(
                        customer = id,
                        kind = %info.kind,
                        resource = info.resource_id,
                        "reservation gone before customer delete"
                    );
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Free units of `kind` id, `None` if no such record.
    pub fn query_free(&self, kind: ReservationKind, id: RecordId) -> Option<i64> {
        self.table(kind).get(id).map(|r| r.num_free())
    }

    pub fn query_price(&self, kind: ReservationKind, id: RecordId) -> Option<i64> {
        self.table(kind).get(id).map(|r| r.price())
    }

    pub fn query_car(&self, id: RecordId) -> Option<i64> {
        self.query_free(ReservationKind::Car, id)
    }

    pub fn query_car_price(&self, id: RecordId) -> Option<i64> {
        self.query_price(ReservationKind::Car, id)
    }

    pub fn query_flight(&self, id: RecordId) -> Option<i64> {
        self.query_free(ReservationKind::Flight, id)
    }

    pub fn query_flight_price(&self, id: RecordId) -> Option<i64> {
        self.query_price(ReservationKind::Flight, id)
    }

    pub fn query_room(&self, id: RecordId) -> Option<i64> {
        self.query_free(ReservationKind::Room, id)
    }

    pub fn query_room_price(&self, id: RecordId) -> Option<i64> {
        self.query_price(ReservationKind::Room, id)
    }

    /// Sum of the prices of everything the customer holds.
    pub fn query_customer_bill(&self, id: CustomerId) -> Option<i64> {
        self.customers
            .get(id)
            .filter(|c| !c.is_closed())
            .map(|c| c.bill())
    }

    /// Full counters of one inventory record.
    pub fn inventory(&self, kind: ReservationKind, id: RecordId) -> Option<Inventory> {
        self.table(kind).get(id).map(|r| r.snapshot())
    }

    pub fn customer_reservations(&self, id: CustomerId) -> Option<Vec<ReservationInfo>> {
        self.customers.get(id).map(|c| c.reservations())
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    /// Take one unit of `kind` id for a customer.
    ///
    /// A customer may hold each `(kind, id)` at most once. If recording
    /// the unit on the customer fails, the unit is given back before
    /// returning, leaving both records as they were.
    pub fn reserve(
        &self,
        kind: ReservationKind,
        customer_id: CustomerId,
        resource_id: RecordId,
    ) -> Result<(), ManagerError> {
        let customer = self
            .customers
            .get(customer_id)
            .ok_or(ManagerError::CustomerNotFound(customer_id))?;
        self.reserve_for(&customer, kind, resource_id)
    }

    /// The body of `reserve` once the account has been looked up. The
    /// account may have been deleted since; its closed ledger then
    /// refuses the entry and the unit is handed back.
    fn reserve_for(
        &self,
        customer: &CustomerAccount,
        kind: ReservationKind,
        resource_id: RecordId,
    ) -> Result<(), ManagerError> {
        let customer_id = customer.id();
        let reservation = self
            .table(kind)
            .get(resource_id)
            .ok_or(ManagerError::ResourceNotFound { kind, id: resource_id })?;

        let price = reservation
            .make_reservation()
            .map_err(|source| ManagerError::Inventory { kind, id: resource_id, source })?;

        if let Err(source) = customer.add_reservation_info(kind, resource_id, price) {
            // Undo the unit taken above.
            if let Err(e) = reservation.cancel() {
                warn!(
                    customer = customer_id,
                    %kind,
                    resource = resource_id,
                    "compensating cancel failed: {}",
                    e
                );
            }
            debug!(
                customer = customer_id,
                %kind,
                resource = resource_id,
                "reservation rolled back: {}",
                source
            );
            return Err(ManagerError::Customer(source));
        }
        Ok(())
    }

    pub fn reserve_car(
        &self,
        customer_id: CustomerId,
        car_id: RecordId,
    ) -> Result<(), ManagerError> {
        self.reserve(ReservationKind::Car, customer_id, car_id)
    }

    pub fn reserve_flight(
        &self,
        customer_id: CustomerId,
        flight_id: RecordId,
    ) -> Result<(), ManagerError> {
        self.reserve(ReservationKind::Flight, customer_id, flight_id)
    }

    pub fn reserve_room(
        &self,
        customer_id: CustomerId,
        room_id: RecordId,
    ) -> Result<(), ManagerError> {
        self.reserve(ReservationKind::Room, customer_id, room_id)
    }

    /// Give back a unit the customer holds.
    ///
    /// The customer's entry is dropped first; if the inventory then
    /// refuses the cancel, the entry is restored.
    pub fn cancel(
        &self,
        kind: ReservationKind,
        customer_id: CustomerId,
        resource_id: RecordId,
    ) -> Result<(), ManagerError> {
        let customer = self
            .customers
            .get(customer_id)
            .ok_or(ManagerError::CustomerNotFound(customer_id))?;
        let reservation = self
            .table(kind)
            .get(resource_id)
            .ok_or(ManagerError::ResourceNotFound { kind, id: resource_id })?;

        let info = customer.remove_reservation_info(kind, resource_id)?;

        if let Err(source) = reservation.cancel() {
            if let Err(e) = customer.add_reservation_info(info.kind, info.resource_id, info.price) {
                warn!(
                    customer = customer_id,
                    %kind,
                    resource = resource_id,
                    "restoring entry failed: {}",
                    e
                );
            }
            debug!(
                customer = customer_id,
                %kind,
                resource = resource_id,
                "cancellation rolled back: {}",
                source
            );
            return Err(ManagerError::Inventory { kind, id: resource_id, source });
        }
        Ok(())
    }

    pub fn cancel_car(
        &self,
        customer_id: CustomerId,
        car_id: RecordId,
    ) -> Result<(), ManagerError> {
        self.cancel(ReservationKind::Car, customer_id, car_id)
    }

    pub fn cancel_flight(
        &self,
        customer_id: CustomerId,
        flight_id: RecordId,
    ) -> Result<(), ManagerError> {
        self.cancel(ReservationKind::Flight, customer_id, flight_id)
    }

    pub fn cancel_room(
        &self,
        customer_id: CustomerId,
        room_id: RecordId,
    ) -> Result<(), ManagerError> {
        self.cancel(ReservationKind::Room, customer_id, room_id)
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Customer already exists: {0}")]
    CustomerExists(CustomerId),

    #[error("{kind} not found: {id}")]
    ResourceNotFound { kind: ReservationKind, id: RecordId },

    #[error("Invalid unit count: {0}")]
    InvalidCount(i64),

    #[error("{kind} {id}: {source}")]
    Inventory {
        kind: ReservationKind,
        id: RecordId,
        source: InventoryError,
    },

    #[error(transparent)]
    Customer(#[from] CustomerError),
}

impl ManagerError {
    pub fn class(&self) -> FailureClass {
        match self {
            ManagerError::CustomerNotFound(_) | ManagerError::ResourceNotFound { .. } => {
                FailureClass::NotFound
            }
            ManagerError::CustomerExists(_) => FailureClass::Precondition,
            ManagerError::InvalidCount(_) => FailureClass::InvalidArgument,
            ManagerError::Inventory { source, .. } => source.class(),
            ManagerError::Customer(source) => source.class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_creates_then_updates() {
        let manager = ResourceManager::new();
        manager.add_car(1, 100, 50).unwrap();
        assert_eq!(manager.query_car(1), Some(100));
        assert_eq!(manager.query_car_price(1), Some(50));

        manager.add_car(1, 20, 65).unwrap();
        assert_eq!(manager.query_car(1), Some(120));
        assert_eq!(manager.query_car_price(1), Some(65));

        // negative price on an existing record keeps the old one
        manager.add_car(1, 5, -1).unwrap();
        assert_eq!(manager.query_car(1), Some(125));
        assert_eq!(manager.query_car_price(1), Some(65));
    }

    #[test]
    fn test_add_rejects_invalid_new_record() {
        let manager = ResourceManager::new();

        let err = manager.add_room(3, 0, 10).unwrap_err();
        assert_eq!(err.class(), FailureClass::InvalidArgument);
        let err = manager.add_room(3, 10, -10).unwrap_err();
        assert_eq!(err.class(), FailureClass::InvalidArgument);
        assert_eq!(manager.query_room(3), None);
        assert_eq!(manager.table_sizes().rooms, 0);
    }

    #[test]
    fn test_delete_removes_emptied_record() {
        let manager = ResourceManager::new();
        manager.add_room(2, 100, 80).unwrap();

        manager.delete_room(2, 40).unwrap();
        assert_eq!(manager.query_room(2), Some(60));
        assert_eq!(manager.query_room_price(2), Some(80));

        let err = manager.delete_room(2, 61).unwrap_err();
        assert_eq!(err.class(), FailureClass::Precondition);
        assert_eq!(manager.query_room(2), Some(60));

        manager.delete_room(2, 60).unwrap();
        assert_eq!(manager.query_room(2), None);
        assert!(!manager.table(ReservationKind::Room).contains(2));
    }

    #[test]
    fn test_delete_missing_or_negative() {
        let manager = ResourceManager::new();
        assert_eq!(
            manager.delete_car(8, 1).unwrap_err(),
            ManagerError::ResourceNotFound { kind: ReservationKind::Car, id: 8 }
        );

        manager.add_car(8, 10, 50).unwrap();
        assert_eq!(manager.delete_car(8, -5).unwrap_err(), ManagerError::InvalidCount(-5));
        assert_eq!(manager.query_car(8), Some(10));
    }

    #[test]
    fn test_deleted_id_can_be_recreated() {
        let manager = ResourceManager::new();
        manager.add_car(4, 10, 50).unwrap();
        manager.delete_car(4, 10).unwrap();
        assert_eq!(manager.query_car(4), None);

        manager.add_car(4, 3, 70).unwrap();
        assert_eq!(manager.inventory(ReservationKind::Car, 4).unwrap().num_total, 3);
        assert_eq!(manager.query_car_price(4), Some(70));
    }

    #[test]
    fn test_delete_flight() {
        let manager = ResourceManager::new();
        assert_eq!(manager.delete_flight(11).unwrap_err().class(), FailureClass::NotFound);

        manager.add_flight(11, 300, 120).unwrap();
        manager.delete_flight(11).unwrap();
        assert_eq!(manager.query_flight(11), None);
    }

    #[test]
    fn test_customer_lifecycle() {
        let manager = ResourceManager::new();
        manager.add_customer(7).unwrap();
        assert_eq!(manager.add_customer(7).unwrap_err(), ManagerError::CustomerExists(7));
        assert_eq!(manager.query_customer_bill(7), Some(0));

        manager.delete_customer(7).unwrap();
        assert_eq!(manager.query_customer_bill(7), None);
        assert_eq!(manager.delete_customer(7).unwrap_err(), ManagerError::CustomerNotFound(7));
    }

    #[test]
    fn test_reserve_failures() {
        let manager = ResourceManager::new();
        manager.add_flight(1, 1, 200).unwrap();

        assert_eq!(
            manager.reserve_flight(5, 1).unwrap_err(),
            ManagerError::CustomerNotFound(5)
        );
        assert_eq!(manager.query_flight(1), Some(1));

        manager.add_customer(5).unwrap();
        manager.add_customer(6).unwrap();
        assert_eq!(manager.reserve_flight(5, 2).unwrap_err().class(), FailureClass::NotFound);

        manager.reserve_flight(5, 1).unwrap();
        let err = manager.reserve_flight(6, 1).unwrap_err();
        assert_eq!(err.class(), FailureClass::Precondition);
        assert_eq!(manager.query_customer_bill(6), Some(0));
    }

    #[test]
    fn test_cancel_round_trip() {
        let manager = ResourceManager::new();
        manager.add_room(1, 2, 90).unwrap();
        manager.add_customer(1).unwrap();

        manager.reserve_room(1, 1).unwrap();
        assert_eq!(manager.query_room(1), Some(1));

        manager.cancel_room(1, 1).unwrap();
        assert_eq!(manager.query_room(1), Some(2));
        assert_eq!(manager.query_customer_bill(1), Some(0));

        // nothing held any more
        let err = manager.cancel_room(1, 1).unwrap_err();
        assert_eq!(err.class(), FailureClass::NotFound);
        assert_eq!(manager.query_room(1), Some(2));
    }

    #[test]
    fn test_cancel_restores_entry_when_inventory_refuses() {
        let manager = ResourceManager::new();
        manager.add_car(3, 5, 40).unwrap();
        manager.add_customer(2).unwrap();

        // an entry with no matching unit in use
        manager
            .customers()
            .get(2)
            .unwrap()
            .add_reservation_info(ReservationKind::Car, 3, 40)
            .unwrap();

        let err = manager.cancel_car(2, 3).unwrap_err();
        assert_eq!(err.class(), FailureClass::Precondition);
        assert_eq!(manager.query_car(3), Some(5));
        assert_eq!(manager.query_customer_bill(2), Some(40));
    }

    #[test]
    fn test_reserve_on_deleted_account_hands_unit_back() {
        let manager = ResourceManager::new();
        manager.add_room(4, 10, 90).unwrap();
        manager.add_customer(12).unwrap();
        let before = manager.inventory(ReservationKind::Room, 4).unwrap();

        // the account as a reserve that looked it up just before the delete sees it
        let stale = manager.customers().get(12).unwrap();
        manager.delete_customer(12).unwrap();

        let err = manager
            .reserve_for(&stale, ReservationKind::Room, 4)
            .unwrap_err();
        assert_eq!(err, ManagerError::Customer(CustomerError::Closed(12)));
        assert_eq!(err.class(), FailureClass::NotFound);
        assert_eq!(manager.inventory(ReservationKind::Room, 4).unwrap(), before);
        assert!(stale.reservations().is_empty());
        assert_eq!(manager.query_customer_bill(12), None);
    }

    #[test]
    fn test_error_messages() {
        let err = ManagerError::ResourceNotFound { kind: ReservationKind::Room, id: 4 };
        assert_eq!(err.to_string(), "ROOM not found: 4");

        let err = ManagerError::Inventory {
            kind: ReservationKind::Car,
            id: 1,
            source: InventoryError::SoldOut(1),
        };
        assert_eq!(err.to_string(), "CAR 1: No free units left on 1");
    }
}

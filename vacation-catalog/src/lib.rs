pub mod reservation;
pub mod customer;

pub use reservation::{Inventory, InventoryError, Reservation};
pub use customer::{CustomerAccount, CustomerError, ReservationInfo};

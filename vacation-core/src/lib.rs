pub mod kind;

pub use kind::ReservationKind;

/// Identifier of a car, flight, room or customer record.
pub type RecordId = i64;

/// Identifier of a customer account.
pub type CustomerId = i64;

/// How a failed operation should be read by callers.
///
/// Every failure in the resource manager falls in one of these classes and
/// none of them is fatal: a workload client simply treats the transaction as
/// "did not apply" and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The operation referenced an id with no backing record.
    NotFound,
    /// Negative price, non-positive initial count and the like.
    InvalidArgument,
    /// The record exists but its state forbids the operation
    /// (sold out, still in use, duplicate id or reservation).
    Precondition,
}

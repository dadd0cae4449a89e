pub mod manager;
pub mod audit;

pub use manager::{ManagerError, ResourceManager, TableSizes};
pub use audit::{audit, teardown, AuditError, AuditReport, Violation};

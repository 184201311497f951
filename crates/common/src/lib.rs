//! Shared types for the serialization and aggregation crates.
//!
//! Holds the typed identifiers, the optimistic-concurrency [`Version`] and the
//! persisted record types (work orders, serial numbers, containers and the
//! customer/product catalog) together with their status enums.

pub mod model;
pub mod types;
pub mod version;

pub use model::{
    ContainerKind, Customer, ParseStatusError, Product, Record, SerialNumber, SerialStatus, Sscc,
    WorkOrder, WorkOrderStatus,
};
pub use types::{CustomerId, ProductId, SerialNumberId, SsccId, WorkOrderId};
pub use version::Version;

pub mod changeset;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod sequence;
pub mod store;

pub use changeset::{Change, ChangeSet, Row};
pub use common::{
    ContainerKind, Customer, CustomerId, Product, ProductId, Record, SerialNumber, SerialNumberId,
    SerialStatus, Sscc, SsccId, Version, WorkOrder, WorkOrderId, WorkOrderStatus,
};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::{PostgresSequenceCounter, PostgresStore};
pub use query::WorkOrderQuery;
pub use sequence::{InMemorySequenceCounter, SSCC_SERIAL_REFERENCE, SequenceCounter};
pub use store::{Store, StoreExt};

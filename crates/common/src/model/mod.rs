//! Persisted record types.
//!
//! Records are plain data. Business rules that span several records live in
//! the `domain` crate; the status enums only answer questions about a single
//! state.

macro_rules! impl_record {
    ($ty:ty, $name:literal) => {
        impl $crate::model::Record for $ty {
            fn record_type() -> &'static str {
                $name
            }

            fn record_id(&self) -> uuid::Uuid {
                self.id.as_uuid()
            }

            fn version(&self) -> $crate::Version {
                self.version
            }

            fn set_version(&mut self, version: $crate::Version) {
                self.version = version;
            }
        }
    };
}

pub(crate) use impl_record;

mod catalog;
mod container;
mod serial_number;
mod work_order;

pub use catalog::{Customer, Product};
pub use container::{ContainerKind, Sscc};
pub use serial_number::{SerialNumber, SerialStatus};
pub use work_order::{WorkOrder, WorkOrderStatus};

use thiserror::Error;
use uuid::Uuid;

use crate::Version;

/// Common behaviour of every persisted record.
pub trait Record {
    /// Name of the record kind, used in error messages and conflict reports.
    fn record_type() -> &'static str;

    /// Returns the record's id as a raw UUID.
    fn record_id(&self) -> Uuid;

    /// Returns the version the record was read at.
    fn version(&self) -> Version;

    /// Sets the record version.
    ///
    /// Called after a successful commit so returned copies match storage.
    fn set_version(&mut self, version: Version);
}

/// Error returned when a stored status string does not name a known variant.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParseStatusError, impl_record};
use crate::{SerialNumberId, SsccId, Version, WorkOrderId};

/// Status of a single serialized item.
///
/// State transitions:
/// ```text
/// Generated ──► Printed ──► Verified ──┬──► Aggregated
///                  │                   │        │
///                  └───────────────────┴──► Rejected
///
/// Aggregated ──(removed from box)──► Verified
/// ```
///
/// Variants are declared in lifecycle order, so `status >= Printed` means the
/// item has at least been printed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum SerialStatus {
    /// Allocated, label not printed yet.
    #[default]
    Generated,

    /// Label printed.
    Printed,

    /// Printed code scanned back successfully.
    Verified,

    /// Failed verification.
    Rejected,

    /// Packed into a box.
    Aggregated,
}

impl SerialStatus {
    /// Returns true if the item is currently packed in a box.
    pub fn is_aggregated(&self) -> bool {
        matches!(self, SerialStatus::Aggregated)
    }

    /// Returns true if the item may be packed into a box.
    pub fn can_aggregate(&self) -> bool {
        !matches!(self, SerialStatus::Rejected)
    }

    /// Returns true if print/verify/reject marks may be applied.
    ///
    /// A boxed item has to be removed from its box first.
    pub fn can_mark(&self) -> bool {
        !self.is_aggregated()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SerialStatus::Generated => "Generated",
            SerialStatus::Printed => "Printed",
            SerialStatus::Verified => "Verified",
            SerialStatus::Rejected => "Rejected",
            SerialStatus::Aggregated => "Aggregated",
        }
    }
}

impl std::fmt::Display for SerialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SerialStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Generated" => Ok(SerialStatus::Generated),
            "Printed" => Ok(SerialStatus::Printed),
            "Verified" => Ok(SerialStatus::Verified),
            "Rejected" => Ok(SerialStatus::Rejected),
            "Aggregated" => Ok(SerialStatus::Aggregated),
            other => Err(ParseStatusError {
                kind: "SerialStatus",
                value: other.to_string(),
            }),
        }
    }
}

/// One physical item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialNumber {
    pub id: SerialNumberId,
    /// AI(21) value, unique within the work order.
    pub serial: String,
    /// Full element string printed on the item.
    pub data_matrix: String,
    pub status: SerialStatus,
    pub printed_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub work_order_id: WorkOrderId,
    /// Box holding the item; only set while `status` is `Aggregated`.
    pub container_id: Option<SsccId>,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl SerialNumber {
    /// Creates a freshly generated serial number.
    pub fn generated(
        work_order_id: WorkOrderId,
        serial: impl Into<String>,
        data_matrix: impl Into<String>,
    ) -> Self {
        Self {
            id: SerialNumberId::new(),
            serial: serial.into(),
            data_matrix: data_matrix.into(),
            status: SerialStatus::Generated,
            printed_at: None,
            verified_at: None,
            work_order_id,
            container_id: None,
            created_at: Utc::now(),
            version: Version::first(),
        }
    }

    /// Returns true if the item sits in the given box.
    pub fn is_in(&self, container_id: SsccId) -> bool {
        self.container_id == Some(container_id)
    }
}

impl_record!(SerialNumber, "SerialNumber");

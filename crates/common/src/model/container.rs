use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParseStatusError, impl_record};
use crate::{SsccId, Version, WorkOrderId};

/// Level of a container in the packaging tree.
///
/// The tree has exactly two levels below the work order: boxes hold serial
/// numbers, pallets hold boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Box,
    Pallet,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Box => "Box",
            ContainerKind::Pallet => "Pallet",
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContainerKind {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Box" => Ok(ContainerKind::Box),
            "Pallet" => Ok(ContainerKind::Pallet),
            other => Err(ParseStatusError {
                kind: "ContainerKind",
                value: other.to_string(),
            }),
        }
    }
}

/// A logistic unit identified by an 18-digit SSCC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sscc {
    pub id: SsccId,
    /// 18-digit SSCC, globally unique.
    pub code: String,
    pub kind: ContainerKind,
    pub work_order_id: WorkOrderId,
    /// Pallet holding this box. Always `None` for pallets.
    pub parent_id: Option<SsccId>,
    /// AI(00) element string.
    pub data_matrix: String,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl Sscc {
    /// Creates an empty, unparented container.
    pub fn new(
        kind: ContainerKind,
        work_order_id: WorkOrderId,
        code: impl Into<String>,
        data_matrix: impl Into<String>,
    ) -> Self {
        Self {
            id: SsccId::new(),
            code: code.into(),
            kind,
            work_order_id,
            parent_id: None,
            data_matrix: data_matrix.into(),
            created_at: Utc::now(),
            version: Version::first(),
        }
    }

    pub fn is_box(&self) -> bool {
        self.kind == ContainerKind::Box
    }

    pub fn is_pallet(&self) -> bool {
        self.kind == ContainerKind::Pallet
    }
}

impl_record!(Sscc, "Sscc");

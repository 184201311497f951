use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ParseStatusError, impl_record};
use crate::{ProductId, Version, WorkOrderId};

/// Lifecycle status of a work order.
///
/// State transitions:
/// ```text
/// Created ──► InProgress ──► Completed
///    │  ▲          │  ▲
///    ▼  │          ▼  │
///    OnHold ◄──────┘──┘
///
/// Created | InProgress | OnHold ──► Cancelled
/// ```
///
/// `InProgress` and `Completed` are reached through serial allocation;
/// `OnHold` and `Cancelled` are set by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WorkOrderStatus {
    /// Created, no serials allocated yet.
    #[default]
    Created,

    /// At least one serial range has been allocated.
    InProgress,

    /// Every serial of the production quantity has been allocated (terminal state).
    Completed,

    /// Cancelled by an operator (terminal state).
    Cancelled,

    /// Paused by an operator.
    OnHold,
}

impl WorkOrderStatus {
    /// Returns true if serial numbers may be allocated in this state.
    pub fn can_generate_serials(&self) -> bool {
        matches!(self, WorkOrderStatus::Created | WorkOrderStatus::InProgress)
    }

    /// Returns true if the order can be put on hold.
    pub fn can_hold(&self) -> bool {
        matches!(self, WorkOrderStatus::Created | WorkOrderStatus::InProgress)
    }

    /// Returns true if the order can be resumed.
    pub fn can_resume(&self) -> bool {
        matches!(self, WorkOrderStatus::OnHold)
    }

    /// Returns true if the order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Created => "Created",
            WorkOrderStatus::InProgress => "InProgress",
            WorkOrderStatus::Completed => "Completed",
            WorkOrderStatus::Cancelled => "Cancelled",
            WorkOrderStatus::OnHold => "OnHold",
        }
    }
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkOrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(WorkOrderStatus::Created),
            "InProgress" => Ok(WorkOrderStatus::InProgress),
            "Completed" => Ok(WorkOrderStatus::Completed),
            "Cancelled" => Ok(WorkOrderStatus::Cancelled),
            "OnHold" => Ok(WorkOrderStatus::OnHold),
            other => Err(ParseStatusError {
                kind: "WorkOrderStatus",
                value: other.to_string(),
            }),
        }
    }
}

/// A production run of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    /// Human-readable order number, unique across work orders.
    pub order_number: String,
    pub product_id: ProductId,
    /// Number of items to serialize.
    pub production_quantity: u32,
    /// AI(10) batch/lot.
    pub batch_number: String,
    /// AI(17) expiry.
    pub expiration_date: NaiveDate,
    /// First sequence number of the run.
    pub serial_number_start: i64,
    /// Highest sequence number allocated so far; `serial_number_start - 1`
    /// before the first allocation.
    pub last_serial_number: i64,
    pub items_per_box: u32,
    pub boxes_per_pallet: u32,
    pub status: WorkOrderStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl WorkOrder {
    pub const DEFAULT_SERIAL_START: i64 = 1;
    pub const DEFAULT_ITEMS_PER_BOX: u32 = 10;
    pub const DEFAULT_BOXES_PER_PALLET: u32 = 100;

    /// Creates a work order with the default serial start and capacities.
    pub fn new(
        order_number: impl Into<String>,
        product_id: ProductId,
        production_quantity: u32,
        batch_number: impl Into<String>,
        expiration_date: NaiveDate,
    ) -> Self {
        Self {
            id: WorkOrderId::new(),
            order_number: order_number.into(),
            product_id,
            production_quantity,
            batch_number: batch_number.into(),
            expiration_date,
            serial_number_start: Self::DEFAULT_SERIAL_START,
            last_serial_number: Self::DEFAULT_SERIAL_START - 1,
            items_per_box: Self::DEFAULT_ITEMS_PER_BOX,
            boxes_per_pallet: Self::DEFAULT_BOXES_PER_PALLET,
            status: WorkOrderStatus::Created,
            is_active: true,
            created_at: Utc::now(),
            version: Version::first(),
        }
    }

    /// Sets the first sequence number and resets the watermark below it.
    pub fn with_serial_start(mut self, start: i64) -> Self {
        self.serial_number_start = start;
        self.last_serial_number = start - 1;
        self
    }

    /// Sets the box and pallet capacities.
    pub fn with_capacities(mut self, items_per_box: u32, boxes_per_pallet: u32) -> Self {
        self.items_per_box = items_per_box;
        self.boxes_per_pallet = boxes_per_pallet;
        self
    }

    /// Number of serials allocated so far.
    pub fn allocated_count(&self) -> u64 {
        (self.last_serial_number - (self.serial_number_start - 1)).max(0) as u64
    }

    /// Number of serials that may still be allocated.
    pub fn remaining_quantity(&self) -> u64 {
        u64::from(self.production_quantity).saturating_sub(self.allocated_count())
    }

    /// Next sequence number to hand out.
    pub fn next_sequence(&self) -> i64 {
        self.last_serial_number + 1
    }
}

impl_record!(WorkOrder, "WorkOrder");

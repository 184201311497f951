use common::WorkOrder;

use crate::{DomainError, Result};

/// An inclusive range of serial sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialRange {
    pub first: i64,
    pub last: i64,
}

impl SerialRange {
    pub fn len(&self) -> u64 {
        (self.last - self.first + 1).unsigned_abs()
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        self.first..=self.last
    }
}

/// Reserves the next `quantity` serials of `work_order` and advances its
/// watermark and status.
///
/// The first allocation moves a `Created` order to `InProgress`; the one that
/// reaches the production quantity moves it to `Completed`. On error the work
/// order is left untouched.
pub fn allocate(work_order: &mut WorkOrder, quantity: u32) -> Result<SerialRange> {
    if !work_order.status.can_generate_serials() {
        return Err(DomainError::WorkOrderStatus {
            status: work_order.status,
            action: "generate serial numbers for",
        });
    }

    if quantity == 0 {
        return Err(DomainError::validation_with(
            "Serial number quantity must be greater than zero",
            [&work_order.order_number],
        ));
    }

    let current = work_order.allocated_count();
    let limit = u64::from(work_order.production_quantity);
    if current + u64::from(quantity) > limit {
        return Err(DomainError::validation_with(
            format!(
                "Cannot generate {quantity} serial numbers: {current} already generated, \
                 production quantity is {limit}"
            ),
            [&work_order.order_number],
        ));
    }

    let last = work_order
        .last_serial_number
        .checked_add(i64::from(quantity))
        .ok_or_else(|| {
            DomainError::validation_with(
                format!(
                    "Cannot generate {quantity} serial numbers: sequence would pass {}",
                    i64::MAX
                ),
                [&work_order.order_number],
            )
        })?;
    let range = SerialRange {
        first: work_order.next_sequence(),
        last,
    };

    work_order.last_serial_number = range.last;
    work_order.status = if work_order.allocated_count() >= limit {
        common::WorkOrderStatus::Completed
    } else {
        common::WorkOrderStatus::InProgress
    };

    Ok(range)
}

use chrono::{DateTime, Utc};
use common::{SerialNumber, SerialStatus, SsccId};

use crate::{DomainError, Result};

/// An operator mark on a single serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Printed,
    Verified,
    Rejected,
}

impl Mark {
    pub fn status(&self) -> SerialStatus {
        match self {
            Mark::Printed => SerialStatus::Printed,
            Mark::Verified => SerialStatus::Verified,
            Mark::Rejected => SerialStatus::Rejected,
        }
    }
}

/// Applies an operator mark.
///
/// Marks are unconditional and re-marking re-stamps the timestamp, except
/// that a serial sitting in a box must be removed from it first.
pub fn apply_mark(serial: &mut SerialNumber, mark: Mark, now: DateTime<Utc>) -> Result<()> {
    if !serial.status.can_mark() {
        return Err(DomainError::validation_with(
            format!(
                "Serial number {} is aggregated; remove it from its box before marking it {}",
                serial.serial,
                mark.status()
            ),
            [&serial.serial],
        ));
    }

    serial.status = mark.status();
    match mark {
        Mark::Printed => serial.printed_at = Some(now),
        Mark::Verified => serial.verified_at = Some(now),
        Mark::Rejected => {}
    }
    Ok(())
}

/// Puts a serial into a box.
pub fn aggregate(serial: &mut SerialNumber, box_id: SsccId) {
    serial.container_id = Some(box_id);
    serial.status = SerialStatus::Aggregated;
}

/// Takes a serial out of its box. The serial goes back to `Verified`.
pub fn release(serial: &mut SerialNumber) {
    serial.container_id = None;
    serial.status = SerialStatus::Verified;
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::WorkOrderId;

    fn serial() -> SerialNumber {
        SerialNumber::generated(WorkOrderId::new(), "00000000000000000001", "dm")
    }

    #[test]
    fn printing_stamps_time() {
        let mut s = serial();
        let now = Utc::now();
        apply_mark(&mut s, Mark::Printed, now).unwrap();
        assert_eq!(s.status, SerialStatus::Printed);
        assert_eq!(s.printed_at, Some(now));
        assert!(s.verified_at.is_none());
    }

    #[test]
    fn re_marking_restamps() {
        let mut s = serial();
        let first = Utc::now();
        apply_mark(&mut s, Mark::Verified, first).unwrap();
        let later = first + chrono::Duration::seconds(5);
        apply_mark(&mut s, Mark::Verified, later).unwrap();
        assert_eq!(s.verified_at, Some(later));
    }

    #[test]
    fn rejection_keeps_existing_timestamps() {
        let mut s = serial();
        let now = Utc::now();
        apply_mark(&mut s, Mark::Printed, now).unwrap();
        apply_mark(&mut s, Mark::Rejected, now).unwrap();
        assert_eq!(s.status, SerialStatus::Rejected);
        assert_eq!(s.printed_at, Some(now));
    }

    #[test]
    fn boxed_serial_cannot_be_marked() {
        let mut s = serial();
        aggregate(&mut s, SsccId::new());
        let err = apply_mark(&mut s, Mark::Rejected, Utc::now()).unwrap_err();
        assert_eq!(err.offending(), [s.serial.clone()]);
        assert_eq!(s.status, SerialStatus::Aggregated);
    }

    #[test]
    fn release_returns_to_verified() {
        let mut s = serial();
        let box_id = SsccId::new();
        aggregate(&mut s, box_id);
        assert!(s.is_in(box_id));

        release(&mut s);
        assert_eq!(s.status, SerialStatus::Verified);
        assert!(s.container_id.is_none());
    }
}

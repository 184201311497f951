//! Domain error types.

use common::WorkOrderStatus;
use gs1::Gs1Error;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced record does not exist or has been deactivated.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A structural or business rule was violated.
    ///
    /// `offending` lists the identifiers (ids, serials or SSCC codes) that
    /// caused the failure.
    #[error("{message}")]
    Validation {
        message: String,
        offending: Vec<String>,
    },

    /// A unique business key is already taken.
    #[error("{entity} with {field} {value} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// An identifier failed its GS1 length or check-digit rule, or a field
    /// does not fit its encoding.
    #[error("GS1 validation failed: {0}")]
    Gs1Validation(#[from] Gs1Error),

    /// The work order's status does not allow the operation.
    #[error("Cannot {action} work order in status {status}")]
    WorkOrderStatus {
        status: WorkOrderStatus,
        action: &'static str,
    },

    /// The store failed, or a concurrency conflict outlived its retries.
    #[error("Store error: {0}")]
    Store(StoreError),
}

/// Coarse classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Duplicate,
    Gs1Validation,
    WorkOrderStatus,
    /// A concurrent writer won; the caller may retry.
    Conflict,
    Internal,
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
            offending: Vec::new(),
        }
    }

    pub fn validation_with<I, T>(message: impl Into<String>, offending: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: std::fmt::Display,
    {
        DomainError::Validation {
            message: message.into(),
            offending: offending.into_iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::Duplicate { .. } => ErrorKind::Duplicate,
            DomainError::Gs1Validation(_) => ErrorKind::Gs1Validation,
            DomainError::WorkOrderStatus { .. } => ErrorKind::WorkOrderStatus,
            DomainError::Store(e) if e.is_conflict() => ErrorKind::Conflict,
            DomainError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if re-running the operation from a fresh read may succeed.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Returns the offending identifiers of a validation failure.
    pub fn offending(&self) -> &[String] {
        match self {
            DomainError::Validation { offending, .. } => offending,
            _ => &[],
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation {
                record_type,
                field,
                value,
            } => DomainError::Duplicate {
                entity: record_type,
                field,
                value,
            },
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::Version;
    use uuid::Uuid;

    #[test]
    fn unique_violation_becomes_duplicate() {
        let err = DomainError::from(StoreError::UniqueViolation {
            record_type: "Customer",
            field: "gln",
            value: "5901234123457".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(
            err.to_string(),
            "Customer with gln 5901234123457 already exists"
        );
    }

    #[test]
    fn conflict_is_classified_separately() {
        let err = DomainError::from(StoreError::ConcurrencyConflict {
            record_type: "Sscc",
            id: Uuid::new_v4(),
            expected: Version::first(),
            actual: Some(Version::new(2)),
        });
        assert!(err.is_conflict());
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let corrupt = DomainError::from(StoreError::Corrupt("bad status".to_string()));
        assert_eq!(corrupt.kind(), ErrorKind::Internal);
    }

    #[test]
    fn validation_carries_offending_ids() {
        let err = DomainError::validation_with("Serial numbers not found", ["a", "b"]);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.offending(), ["a".to_string(), "b".to_string()]);
        assert!(DomainError::validation("x").offending().is_empty());
    }

    #[test]
    fn status_error_message() {
        let err = DomainError::WorkOrderStatus {
            status: WorkOrderStatus::Cancelled,
            action: "generate serial numbers for",
        };
        assert_eq!(
            err.to_string(),
            "Cannot generate serial numbers for work order in status Cancelled"
        );
    }
}

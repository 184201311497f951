//! Domain layer for GS1 serialization and aggregation.
//!
//! This crate provides:
//! - Serial number allocation per work order and the serial lifecycle
//! - The aggregation engine that packs items into boxes and boxes onto pallets
//! - Catalog operations for customers, products and work orders
//! - The error taxonomy callers map to their own responses
//!
//! Every service reads the current state from a [`store::Store`], validates,
//! and commits one change set. Stale reads are retried, see [`retry`].

pub mod aggregation;
pub mod catalog;
pub mod config;
pub mod error;
mod lookup;
pub mod retry;
pub mod serialization;

pub use aggregation::{AggregationHierarchy, AggregationService, BoxContents, HierarchyContents};
pub use catalog::{CatalogService, NewProduct, NewWorkOrder, WorkOrderSummary};
pub use config::{Config, LogFormat};
pub use error::{DomainError, ErrorKind, Result};
pub use gs1::IdentifierKind;
pub use serialization::{Mark, SerialRange, SerializationService};

/// Checks a GTIN, GLN or SSCC string.
///
/// Returns `GS1Validation` naming the kind and value when the length or the
/// check digit is wrong.
pub fn validate_identifier(kind: IdentifierKind, code: &str) -> Result<()> {
    gs1::ensure_valid(kind, code)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation_maps_to_gs1_kind() {
        assert!(validate_identifier(IdentifierKind::Sscc, "106141411234567897").is_ok());

        let err = validate_identifier(IdentifierKind::Gtin, "5901234123458").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Gs1Validation);
        assert_eq!(err.to_string(), "GS1 validation failed: Invalid GTIN: 5901234123458");
    }
}

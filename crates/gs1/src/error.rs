//! Codec error types.

use thiserror::Error;

use crate::IdentifierKind;

/// Errors produced by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Gs1Error {
    /// Input is empty, contains non-digit characters or is out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Identifier failed its length or check-digit rule.
    #[error("Invalid {kind}: {value}")]
    InvalidIdentifier { kind: IdentifierKind, value: String },

    /// Encoded field does not fit its maximum width.
    #[error("{field} exceeds {max} characters (got {actual})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, Gs1Error>;

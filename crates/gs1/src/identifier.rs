//! GTIN, GLN and SSCC validation.

use serde::{Deserialize, Serialize};

use crate::check_digit::has_valid_check_digit;
use crate::{Gs1Error, Result};

/// Kinds of GS1 keys the codec validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// Global Trade Item Number: 8, 12, 13 or 14 digits.
    Gtin,
    /// Global Location Number: 13 digits.
    Gln,
    /// Serial Shipping Container Code: 18 digits.
    Sscc,
}

impl IdentifierKind {
    /// Lengths accepted for this kind, check digit included.
    pub fn allowed_lengths(&self) -> &'static [usize] {
        match self {
            IdentifierKind::Gtin => &[8, 12, 13, 14],
            IdentifierKind::Gln => &[13],
            IdentifierKind::Sscc => &[18],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Gtin => "GTIN",
            IdentifierKind::Gln => "GLN",
            IdentifierKind::Sscc => "SSCC",
        }
    }
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IdentifierKind {
    type Err = Gs1Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gtin" => Ok(IdentifierKind::Gtin),
            "gln" => Ok(IdentifierKind::Gln),
            "sscc" => Ok(IdentifierKind::Sscc),
            other => Err(Gs1Error::InvalidInput(format!(
                "unknown identifier kind: {other}"
            ))),
        }
    }
}

/// Returns true if `code` has an allowed length for `kind` and a correct
/// check digit.
pub fn validate(kind: IdentifierKind, code: &str) -> bool {
    kind.allowed_lengths().contains(&code.len()) && has_valid_check_digit(code)
}

/// Like [`validate`], but returns an error naming the offending value.
pub fn ensure_valid(kind: IdentifierKind, code: &str) -> Result<()> {
    if validate(kind, code) {
        Ok(())
    } else {
        Err(Gs1Error::InvalidIdentifier {
            kind,
            value: code.to_string(),
        })
    }
}

pub fn validate_gtin(code: &str) -> bool {
    validate(IdentifierKind::Gtin, code)
}

pub fn validate_gln(code: &str) -> bool {
    validate(IdentifierKind::Gln, code)
}

pub fn validate_sscc(code: &str) -> bool {
    validate(IdentifierKind::Sscc, code)
}

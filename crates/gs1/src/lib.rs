//! GS1 identifier codec.
//!
//! Pure functions for the identifiers used in serialization and aggregation:
//! - Mod-10 check digits
//! - GTIN, GLN and SSCC validation
//! - AI(21) serial numbers and 18-digit SSCCs
//! - Data Matrix element strings for items and containers

pub mod check_digit;
pub mod data_matrix;
pub mod error;
pub mod generate;
pub mod identifier;

pub use check_digit::calculate_check_digit;
pub use data_matrix::{
    GROUP_SEPARATOR, format_expiration_date, generate_gs1_data_matrix, generate_sscc_data_matrix,
};
pub use error::{Gs1Error, Result};
pub use generate::{MAX_SERIAL_LENGTH, SSCC_BODY_LENGTH, generate_serial_number, generate_sscc};
pub use identifier::{
    IdentifierKind, ensure_valid, validate, validate_gln, validate_gtin, validate_sscc,
};

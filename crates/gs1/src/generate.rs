//! Serial number and SSCC generation.

use crate::{Gs1Error, Result, calculate_check_digit};

/// Maximum length of an AI(21) serial number.
pub const MAX_SERIAL_LENGTH: usize = 20;

/// Digits in an SSCC before its check digit.
pub const SSCC_BODY_LENGTH: usize = 17;

/// Renders a sequence number as an AI(21) serial.
///
/// The sequence is zero-padded to `20 - prefix.len()` digits and the prefix
/// is prepended, so the result is always exactly 20 characters.
///
/// ```
/// assert_eq!(gs1::generate_serial_number(42, Some("LOT")).unwrap(), "LOT00000000000000042");
/// ```
pub fn generate_serial_number(sequence: u64, prefix: Option<&str>) -> Result<String> {
    let prefix = prefix.unwrap_or_default();
    if prefix.len() >= MAX_SERIAL_LENGTH {
        return Err(Gs1Error::FieldTooLong {
            field: "serial prefix",
            max: MAX_SERIAL_LENGTH - 1,
            actual: prefix.len(),
        });
    }

    let width = MAX_SERIAL_LENGTH - prefix.len();
    let serial = format!("{prefix}{sequence:0width$}");
    if serial.len() > MAX_SERIAL_LENGTH {
        return Err(Gs1Error::FieldTooLong {
            field: "serial number",
            max: MAX_SERIAL_LENGTH,
            actual: serial.len(),
        });
    }

    Ok(serial)
}

/// Builds an 18-digit SSCC.
///
/// Layout: extension digit, company prefix (non-digits stripped), serial
/// reference zero-padded to fill 17 digits, then the check digit.
pub fn generate_sscc(
    company_prefix: &str,
    extension_digit: u8,
    serial_reference: u64,
) -> Result<String> {
    if extension_digit > 9 {
        return Err(Gs1Error::InvalidInput(format!(
            "extension digit must be 0-9, got {extension_digit}"
        )));
    }

    let clean_prefix: String = company_prefix
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if clean_prefix.len() + 1 >= SSCC_BODY_LENGTH {
        return Err(Gs1Error::FieldTooLong {
            field: "company prefix",
            max: SSCC_BODY_LENGTH - 2,
            actual: clean_prefix.len(),
        });
    }

    let width = SSCC_BODY_LENGTH - 1 - clean_prefix.len();
    let reference = format!("{serial_reference:0width$}");
    if reference.len() > width {
        return Err(Gs1Error::FieldTooLong {
            field: "serial reference",
            max: width,
            actual: reference.len(),
        });
    }

    let body = format!("{extension_digit}{clean_prefix}{reference}");
    let check = calculate_check_digit(&body)?;
    Ok(format!("{body}{check}"))
}

//! GS1 Mod-10 check digit.

use crate::{Gs1Error, Result};

/// Computes the GS1 check digit for a digit string.
///
/// Digits are weighted 3, 1, 3, 1, ... starting from the rightmost digit.
/// The check digit is the amount needed to round the weighted sum up to the
/// next multiple of ten.
///
/// ```
/// assert_eq!(gs1::calculate_check_digit("590123412345").unwrap(), 7);
/// ```
pub fn calculate_check_digit(digits: &str) -> Result<u8> {
    if digits.is_empty() {
        return Err(Gs1Error::InvalidInput(
            "check digit input is empty".to_string(),
        ));
    }

    let mut sum: u64 = 0;
    for (position, ch) in digits.chars().rev().enumerate() {
        let digit = ch.to_digit(10).ok_or_else(|| {
            Gs1Error::InvalidInput(format!("non-digit character {ch:?} in {digits:?}"))
        })?;
        let weight = if position % 2 == 0 { 3 } else { 1 };
        sum += u64::from(digit * weight);
    }

    Ok(((10 - sum % 10) % 10) as u8)
}

/// Returns true if `code` is all digits and its last digit matches the check
/// digit computed over the rest.
pub(crate) fn has_valid_check_digit(code: &str) -> bool {
    if code.len() < 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let (body, claimed) = code.split_at(code.len() - 1);
    let claimed = claimed.as_bytes()[0] - b'0';
    matches!(calculate_check_digit(body), Ok(computed) if computed == claimed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_gtin13_check_digit() {
        assert_eq!(calculate_check_digit("590123412345").unwrap(), 7);
    }

    #[test]
    fn known_sscc_check_digit() {
        // GS1 General Specifications example SSCC 106141411234567897
        assert_eq!(calculate_check_digit("10614141123456789").unwrap(), 7);
    }

    #[test]
    fn rightmost_digit_weighs_three() {
        assert_eq!(calculate_check_digit("1").unwrap(), 7);
        assert_eq!(calculate_check_digit("10").unwrap(), 9);
    }

    #[test]
    fn zero_sum_gives_zero() {
        assert_eq!(calculate_check_digit("0000").unwrap(), 0);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            calculate_check_digit(""),
            Err(Gs1Error::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_non_digits() {
        assert!(calculate_check_digit("12a4").is_err());
        assert!(calculate_check_digit("12 4").is_err());
        assert!(calculate_check_digit("١٢").is_err());
    }

    #[test]
    fn verifies_trailing_check_digit() {
        assert!(has_valid_check_digit("5901234123457"));
        assert!(!has_valid_check_digit("5901234123458"));
        assert!(!has_valid_check_digit("7"));
        assert!(!has_valid_check_digit("59012341234x7"));
    }
}

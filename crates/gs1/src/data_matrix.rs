//! GS1 Data Matrix element strings.
//!
//! Item payload: `01<GTIN-14>17<YYMMDD>10<batch><GS>21<serial>`.
//! Container payload: `00<SSCC>`.
//!
//! AI(01), AI(17) and AI(00) are fixed-length and need no separator. AI(10)
//! is variable-length and is followed by AI(21), so it is terminated with the
//! GS character (ASCII 29), the transmitted form of FNC1. AI(21) is the last
//! element and needs no terminator.

use chrono::NaiveDate;

/// ASCII 29, written in place of FNC1 after a variable-length field.
pub const GROUP_SEPARATOR: char = '\u{1D}';

const AI_SSCC: &str = "00";
const AI_GTIN: &str = "01";
const AI_BATCH: &str = "10";
const AI_EXPIRY: &str = "17";
const AI_SERIAL: &str = "21";

/// Formats an expiry date as `YYMMDD`.
pub fn format_expiration_date(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Builds the element string printed on a serialized item.
///
/// The GTIN is left-padded with zeros to 14 digits.
pub fn generate_gs1_data_matrix(
    gtin: &str,
    serial: &str,
    expiration_date: NaiveDate,
    batch: &str,
) -> String {
    format!(
        "{AI_GTIN}{gtin:0>14}{AI_EXPIRY}{expiry}{AI_BATCH}{batch}{GROUP_SEPARATOR}{AI_SERIAL}{serial}",
        expiry = format_expiration_date(expiration_date),
    )
}

/// Builds the element string printed on a box or pallet label.
pub fn generate_sscc_data_matrix(sscc: &str) -> String {
    format!("{AI_SSCC}{sscc}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn item_payload_layout() {
        let payload =
            generate_gs1_data_matrix("5901234123457", "0000000001", date(2026, 1, 30), "BATCH01");
        assert_eq!(
            payload,
            "01059012341234571726013010BATCH01\u{1D}210000000001"
        );
    }

    #[test]
    fn gtin14_is_not_padded_further() {
        let payload = generate_gs1_data_matrix("05901234123457", "1", date(2030, 12, 31), "L");
        assert!(payload.starts_with("010590123412345717301231"));
    }

    #[test]
    fn gtin8_is_padded_to_fourteen() {
        let payload = generate_gs1_data_matrix("96385074", "1", date(2030, 12, 31), "L");
        assert!(payload.starts_with("010000009638507417"));
    }

    #[test]
    fn separator_only_after_batch() {
        let payload = generate_gs1_data_matrix("5901234123457", "SN", date(2026, 1, 30), "B1");
        assert_eq!(payload.matches(GROUP_SEPARATOR).count(), 1);
        assert!(payload.ends_with(&format!("10B1{GROUP_SEPARATOR}21SN")));
    }

    #[test]
    fn expiry_is_yymmdd() {
        assert_eq!(format_expiration_date(date(2026, 1, 30)), "260130");
        assert_eq!(format_expiration_date(date(2009, 11, 5)), "091105");
    }

    #[test]
    fn sscc_payload_has_ai_00() {
        assert_eq!(
            generate_sscc_data_matrix("106141411234567897"),
            "00106141411234567897"
        );
    }
}

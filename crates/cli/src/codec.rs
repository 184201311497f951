//! Codec subcommands. Pure, no store access.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use gs1::IdentifierKind;

/// Arguments for `sscc`.
#[derive(Args, Debug)]
pub struct SsccArgs {
    /// Company prefix, or a full GLN when `--prefix-length` is given.
    #[arg(long)]
    pub company_prefix: String,

    /// Keep only the first N digits of `--company-prefix`.
    #[arg(long)]
    pub prefix_length: Option<usize>,

    /// Extension digit, 0-9.
    #[arg(long, default_value_t = 0)]
    pub extension_digit: u8,

    /// Serial reference filling the remaining digits.
    #[arg(long)]
    pub reference: u64,
}

/// Arguments for `data-matrix`.
#[derive(Args, Debug)]
pub struct DataMatrixArgs {
    #[arg(long)]
    pub gtin: String,

    #[arg(long)]
    pub serial: String,

    /// Expiry date as YYYY-MM-DD.
    #[arg(long)]
    pub expiry: String,

    #[arg(long)]
    pub batch: String,

    /// Print the group separator as `<GS>` instead of the raw control character.
    #[arg(long)]
    pub readable: bool,
}

pub fn check_digit(digits: &str) -> Result<String> {
    let digit = gs1::calculate_check_digit(digits)?;
    Ok(format!("{digits}{digit}"))
}

/// Validates `code` and describes the outcome.
///
/// An invalid code is an error so the process exits non-zero.
pub fn validate(kind: IdentifierKind, code: &str) -> Result<String> {
    domain::validate_identifier(kind, code)?;
    Ok(format!("{kind} {code} is valid"))
}

pub fn serial(sequence: u64, prefix: Option<&str>) -> Result<String> {
    Ok(gs1::generate_serial_number(sequence, prefix)?)
}

pub fn sscc(args: &SsccArgs) -> Result<String> {
    let prefix = match args.prefix_length {
        Some(length) => {
            let config = domain::Config {
                company_prefix_length: length,
                ..domain::Config::default()
            };
            config.company_prefix(&args.company_prefix).to_string()
        }
        None => args.company_prefix.clone(),
    };
    let code = gs1::generate_sscc(&prefix, args.extension_digit, args.reference)?;
    Ok(format!("{code}\n{}", gs1::generate_sscc_data_matrix(&code)))
}

pub fn data_matrix(args: &DataMatrixArgs) -> Result<String> {
    let expiry = NaiveDate::parse_from_str(&args.expiry, "%Y-%m-%d")
        .with_context(|| format!("invalid expiry date {:?}, expected YYYY-MM-DD", args.expiry))?;
    gs1::ensure_valid(IdentifierKind::Gtin, &args.gtin)?;

    let payload = gs1::generate_gs1_data_matrix(&args.gtin, &args.serial, expiry, &args.batch);
    if args.readable {
        Ok(payload.replace(gs1::GROUP_SEPARATOR, "<GS>"))
    } else {
        Ok(payload)
    }
}

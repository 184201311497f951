//! Configuration loaded from environment variables.

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (default: unset, in-memory store)
/// - `SSCC_EXTENSION_DIGIT`: first digit of every minted SSCC (default: `0`)
/// - `SSCC_COUNTER_SEED`: first SSCC serial reference handed out (default: `1`)
/// - `GS1_COMPANY_PREFIX_LENGTH`: GLN digits used as company prefix (default: `9`)
/// - `MAX_CONFLICT_RETRIES`: re-runs after a concurrency conflict (default: `3`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub sscc_extension_digit: u8,
    pub sscc_counter_seed: i64,
    pub company_prefix_length: usize,
    pub max_conflict_retries: u32,
    pub log_level: String,
    pub log_format: LogFormat,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            sscc_extension_digit: env_or("SSCC_EXTENSION_DIGIT", defaults.sscc_extension_digit)
                .min(9),
            sscc_counter_seed: env_or("SSCC_COUNTER_SEED", defaults.sscc_counter_seed).max(0),
            company_prefix_length: env_or(
                "GS1_COMPANY_PREFIX_LENGTH",
                defaults.company_prefix_length,
            ),
            max_conflict_retries: env_or("MAX_CONFLICT_RETRIES", defaults.max_conflict_retries),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: env_or("LOG_FORMAT", defaults.log_format),
        }
    }

    /// Derives the SSCC company prefix from a customer GLN.
    pub fn company_prefix<'a>(&self, gln: &'a str) -> &'a str {
        let end = gln
            .char_indices()
            .nth(self.company_prefix_length)
            .map_or(gln.len(), |(i, _)| i);
        &gln[..end]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            sscc_extension_digit: 0,
            sscc_counter_seed: 1,
            company_prefix_length: 9,
            max_conflict_retries: 3,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

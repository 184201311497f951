//! Command-line front end for the serialization core.
//!
//! Argument parsing lives in `main.rs`; the handlers here return the text to
//! print so they can be tested without a terminal.
//!
//! - `codec`: check digits, identifier validation, serial/SSCC/Data Matrix encoding
//! - `database`: migrations, aggregation hierarchy and work order summaries
//! - `logging`: tracing subscriber set up from [`domain::Config`]
//! - `telemetry`: Prometheus recorder for the domain counters

pub mod codec;
pub mod database;
pub mod logging;
pub mod telemetry;

//! `gs1ctl` entry point.

use clap::{Parser, Subcommand};
use domain::{Config, IdentifierKind};
use gs1_cli::{codec, database, logging, telemetry};

/// GS1 serialization toolkit.
///
/// Codec utilities work offline. `migrate`, `hierarchy` and `summary` read
/// `DATABASE_URL`.
#[derive(Parser, Debug)]
#[command(name = "gs1ctl", version, about)]
struct Cli {
    /// Print the collected Prometheus metrics to stderr when done.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append the Mod-10 check digit to a digit string.
    CheckDigit { digits: String },
    /// Validate a GTIN, GLN or SSCC.
    Validate {
        /// gtin, gln or sscc.
        kind: IdentifierKind,
        code: String,
    },
    /// Render an AI(21) serial number.
    Serial {
        sequence: u64,
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Build an SSCC and its Data Matrix payload.
    Sscc(codec::SsccArgs),
    /// Build the Data Matrix payload of a serialized item.
    DataMatrix(codec::DataMatrixArgs),
    /// Apply database migrations.
    Migrate,
    /// Print a box or pallet with its contents as JSON.
    Hierarchy {
        /// Container id or 18-digit SSCC.
        container: String,
    },
    /// Print serialization progress of a work order as JSON.
    Summary { order_number: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    logging::init(&config);
    let metrics = telemetry::install()?;

    let cli = Cli::parse();
    let output = match cli.command {
        Commands::CheckDigit { digits } => codec::check_digit(&digits)?,
        Commands::Validate { kind, code } => codec::validate(kind, &code)?,
        Commands::Serial { sequence, prefix } => codec::serial(sequence, prefix.as_deref())?,
        Commands::Sscc(args) => codec::sscc(&args)?,
        Commands::DataMatrix(args) => codec::data_matrix(&args)?,
        Commands::Migrate => database::migrate(&config).await?,
        Commands::Hierarchy { container } => database::hierarchy(&config, &container).await?,
        Commands::Summary { order_number } => database::summary(&config, &order_number).await?,
    };

    println!("{output}");
    if cli.metrics {
        eprint!("{}", metrics.render());
    }
    Ok(())
}

//! cadence-heatmap - Render weekday × hour activity from a collected table

use clap::Parser;
use libcadence::logging::LoggingConfig;
use libcadence::table::read_table;
use libcadence::{Config, Heatmap, HeatmapKind, Result, TableFormat};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "cadence-heatmap")]
#[command(version, about = "Render weekday × hour activity heatmaps")]
#[command(long_about = r#"Read a table written by cadence-collect and count posts by weekday
and hour of day. Rows run Sunday to Saturday, columns 00 to 23.

EXAMPLES:
    # Heatmap of the table named in the config file
    cadence-heatmap

    # Only retweets, from a specific file
    cadence-heatmap --input corpus.jsonl --kind retweets

    # Count matrix for a spreadsheet
    cadence-heatmap --format csv > heatmap.csv

OUTPUT FORMATS:
    text - Shaded grid with legend (default)
    csv  - weekday,0,...,23 count matrix
"#)]
struct Cli {
    /// Table to read (defaults to the configured output path)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Table serialization (guessed from the extension if omitted)
    #[arg(long, value_name = "FORMAT")]
    #[arg(value_parser = ["csv", "jsonl"])]
    table_format: Option<String>,

    /// Which posts to count
    #[arg(short, long, default_value = "all", value_name = "KIND")]
    #[arg(value_parser = ["all", "original", "retweets"])]
    kind: String,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "csv"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let input = match cli.input {
        Some(path) => path,
        None => Config::load()?.output_path(),
    };
    let table_format = match &cli.table_format {
        Some(format) => format.parse::<TableFormat>()?,
        None => TableFormat::from_path(&input),
    };
    let kind: HeatmapKind = cli.kind.parse()?;

    let rows = read_table(&input, table_format)?;
    debug!("Read {} rows from {}", rows.len(), input.display());

    let heatmap = Heatmap::from_rows(&rows, kind);
    match cli.format.as_str() {
        "csv" => print!("{}", heatmap.render_csv()),
        _ => print!("{}", heatmap.render_text()),
    }
    Ok(())
}

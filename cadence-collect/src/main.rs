//! cadence-collect - Collect recent posts from an account's followers

use clap::Parser;
use libcadence::api::twitter::TwitterClient;
use libcadence::api::TimelineApi;
use libcadence::error::OutputError;
use libcadence::logging::LoggingConfig;
use libcadence::table::write_table;
use libcadence::{
    Config, CorpusAggregator, Credentials, RateLimitTracker, Result, RunSummary, SystemClock,
    TableFormat,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cadence-collect")]
#[command(version, about = "Collect recent posts from an account's followers")]
#[command(long_about = r#"Walk an account's followers, read each follower's posts inside the
lookback window, and write them as a flat table for activity analysis.

Followers who post more than the daily cap allows, or whose timeline is
nearly empty, are skipped. Rate limits are respected by sleeping until the
provider's reset time.

EXAMPLES:
    # Followers of the account named in the credentials file
    cadence-collect

    # Someone else's followers, two weeks back, as JSON lines
    cadence-collect --account rustlang --lookback-days 14 --output corpus.jsonl

    # Machine-readable run summary
    cadence-collect --format json | jq '.accepted'

EXIT CODES:
    0 - Success
    1 - Configuration, network or output error
    2 - Authentication failed
    3 - Invalid input
"#)]
struct Cli {
    /// Account whose followers are collected (defaults to the credentials handle)
    #[arg(short, long, value_name = "HANDLE")]
    account: Option<String>,

    /// Configuration file (defaults to CADENCE_CONFIG or the XDG config dir)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Where to write the table
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// How many days back to collect
    #[arg(long, value_name = "DAYS")]
    lookback_days: Option<u32>,

    /// Posts per day above which a follower is skipped
    #[arg(long, value_name = "N")]
    max_posts_per_day: Option<u32>,

    /// Table serialization
    #[arg(long, value_name = "FORMAT")]
    #[arg(value_parser = ["csv", "jsonl"])]
    table_format: Option<String>,

    /// Summary output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    output: String,
    table_format: TableFormat,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let output_path = cli.output.clone().unwrap_or_else(|| config.output_path());
    let table_format = match &cli.table_format {
        Some(format) => format.parse::<TableFormat>()?,
        None if cli.output.is_some() => TableFormat::from_path(&output_path),
        None => config.output.format,
    };
    let offset = config.output.utc_offset()?;

    let credentials = Credentials::load_from_path(&config.credentials_path())?;
    let account = cli
        .account
        .clone()
        .unwrap_or_else(|| credentials.account_handle.clone());

    let mut client = TwitterClient::from_credentials(&credentials)?;
    client.authenticate().await?;
    info!("Authenticated with {}", client.name());

    let params = &config.collection;
    let clock = SystemClock;
    let mut tracker = RateLimitTracker::from_params(params);
    let (corpus, summary) = CorpusAggregator::new(&client, &clock, params)
        .run(&mut tracker, &account)
        .await?;

    write_table(&output_path, &corpus.rows(offset), table_format)?;
    info!("Wrote {} rows to {}", corpus.len(), output_path.display());

    if cli.format == "json" {
        let report = Report {
            summary: &summary,
            output: output_path.display().to_string(),
            table_format,
        };
        let json = serde_json::to_string_pretty(&report).map_err(OutputError::Serialize)?;
        println!("{}", json);
    } else {
        println!("{}", summary);
        println!("Table: {} ({})", output_path.display(), table_format);
    }

    Ok(())
}

/// Load the config file and apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    if let Some(days) = cli.lookback_days {
        config.collection.lookback_days = days;
    }
    if let Some(per_day) = cli.max_posts_per_day {
        config.collection.max_posts_per_day = per_day;
    }

    config.validate()?;
    Ok(config)
}

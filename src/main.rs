use clap::{Parser, Subcommand};
use prodev::config::{load_config, Config, DbConfig};
use prodev::core::db::Server;
use prodev::core::Result;
use prodev::record::Record;
use prodev::retry::RetryPolicy;
use prodev::seed::seed;
use prodev::stream::{ages_over, average_user_age, format_average, lazy_paginate, stream_batches, stream_rows};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Streams the user_data table row by row, in batches, or page by page.
#[derive(Parser)]
#[command(name = "prodev", version)]
struct Cli {
    /// TOML configuration file; DB_HOST, DB_USER, DB_PASS and DB_NAME override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and table, then load users from a CSV file
    Seed { csv: PathBuf },
    /// Print users one JSON object per line
    Stream {
        /// Stop after this many users
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print users older than a threshold, reading the table in batches
    Batches {
        #[arg(long)]
        size: Option<usize>,
        #[arg(long)]
        over: Option<u32>,
    },
    /// Print the table one page at a time
    Paginate {
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Print the average user age
    Average,
}

fn print_record(out: &mut impl Write, record: &Record) -> Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?.apply_env(),
        None => Config {
            database: DbConfig::from_env(),
            ..Config::default()
        },
    };

    let server = Server::new(&config.database)?;
    info!(database = server.database(), root = %server.root().display(), "using database");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Seed { csv } => {
            let report = seed(&server, &csv)?;
            writeln!(
                out,
                "Inserted {} users ({} malformed rows skipped, {} already present)",
                report.inserted, report.skipped, report.duplicates
            )?;
        }
        Command::Stream { limit } => {
            stream_rows(&server, |rows| -> Result<()> {
                for row in rows.take(limit.unwrap_or(usize::MAX)) {
                    print_record(&mut out, &row?)?;
                }
                Ok(())
            })?;
        }
        Command::Batches { size, over } => {
            let size = size.unwrap_or(config.stream.batch_size);
            let threshold = over.unwrap_or(config.stream.age_threshold);
            stream_batches(&server, size, |batches| -> Result<()> {
                for record in ages_over(batches, threshold) {
                    print_record(&mut out, &record?)?;
                }
                Ok(())
            })?;
        }
        Command::Paginate { page_size } => {
            let page_size = page_size.unwrap_or(config.stream.page_size);
            let pages = lazy_paginate(&server, page_size).with_retry(RetryPolicy::from(&config.retry));
            for page in pages {
                let page = page?;
                writeln!(out, "# page offset={} rows={}", page.offset, page.len())?;
                for record in page {
                    print_record(&mut out, &record)?;
                }
            }
        }
        Command::Average => {
            let average = average_user_age(&server)?;
            writeln!(out, "Average age of users: {}", format_average(average))?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

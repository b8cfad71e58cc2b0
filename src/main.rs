//! Main entry point for the listening port inventory
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;

use listening_port::cli::args::{Cli, OutputFormatArg};
use listening_port::config::DatabaseConfig;
use listening_port::formats::traits::{OutputDestination, OutputFormat, OutputWriter};
use listening_port::inventory::collect;
use listening_port::netstat::{NetstatCommand, SocketRecord};
use listening_port::process::SystemProcessTable;
use listening_port::store::{Inventory, SyncReport};

const EXIT_COLLECT_FAILED: u8 = 1;
const EXIT_STORE_FAILED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let source = NetstatCommand::new(&cli.netstat);
    let mut table = SystemProcessTable::new();
    let collection = match collect(&source, &mut table) {
        Ok(collection) => collection,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_COLLECT_FAILED);
        }
    };
    if !collection.errors.is_empty() {
        log::warn!(
            "{} of {} listening sockets could not be enriched",
            collection.errors.len(),
            collection.records.len()
        );
    }

    if let Some(format) = cli.format {
        if let Err(e) = print_records(format, cli.output.clone(), &collection.records) {
            eprintln!("{:#}", e);
            return ExitCode::from(EXIT_COLLECT_FAILED);
        }
    }

    if cli.no_store {
        return ExitCode::SUCCESS;
    }

    match store(&cli, &collection.records) {
        Ok(report) => {
            if report.failed > 0 {
                log::warn!("{} rows could not be stored", report.failed);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(EXIT_STORE_FAILED)
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_records(
    format: OutputFormatArg,
    output: Option<std::path::PathBuf>,
    records: &[SocketRecord],
) -> anyhow::Result<()> {
    let format = match format {
        OutputFormatArg::Text => OutputFormat::Text,
        OutputFormatArg::Csv => OutputFormat::Csv,
        OutputFormatArg::Json => OutputFormat::Json,
        OutputFormatArg::Jsonl => OutputFormat::Jsonl,
    };
    let destination = match output {
        Some(path) => OutputDestination::File(path),
        None => OutputDestination::Stdout,
    };

    OutputWriter::new(format, destination)
        .write_records(records)
        .context("write inventory failed")
}

fn store(cli: &Cli, records: &[SocketRecord]) -> anyhow::Result<SyncReport> {
    let config = DatabaseConfig::load(&cli.config)
        .with_context(|| format!("parse config {} failed", cli.config.display()))?;
    let inventory = Inventory::open(&config).context("connect database failed")?;
    Ok(inventory.sync(records))
}

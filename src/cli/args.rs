//! Command-line argument parsing for the listening port inventory
use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "listening-port", version)]
#[command(about = "Record listening TCP ports and their owning processes", long_about = None)]
pub struct Cli {
    /// Database configuration file
    #[arg(short, long, value_name = "FILE", default_value = crate::config::DEFAULT_CONFIG)]
    pub config: std::path::PathBuf,

    /// Print the inventory in this format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormatArg>,

    /// Output file for --format (default: stdout)
    #[arg(short, long, value_name = "FILE", requires = "format")]
    pub output: Option<std::path::PathBuf>,

    /// Collect only, do not write to the database
    #[arg(short, long)]
    pub no_store: bool,

    /// Path to the netstat binary
    #[arg(long, value_name = "PATH", default_value = crate::netstat::DEFAULT_NETSTAT, hide = true)]
    pub netstat: std::path::PathBuf,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Enable verbose output (warnings, status messages)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormatArg {
    Text,
    Csv,
    Json,
    Jsonl,
}

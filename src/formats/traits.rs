//! Output format traits for the listening port inventory
use crate::error::Result;
use crate::netstat::SocketRecord;

/// Trait for output formatters
pub trait OutputFormatter {
    fn format_records(&self, records: &[SocketRecord]) -> Result<String>;
}

/// Enum for output format types
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
    Jsonl,
}

/// Enum for output destination
#[derive(Debug, Clone)]
pub enum OutputDestination {
    Stdout,
    File(std::path::PathBuf),
}

/// Output writer that combines format and destination
pub struct OutputWriter {
    formatter: Box<dyn OutputFormatter>,
    destination: OutputDestination,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, destination: OutputDestination) -> Self {
        let formatter: Box<dyn OutputFormatter> = match format {
            OutputFormat::Text => Box::new(crate::formats::text::TextFormatter),
            OutputFormat::Csv => Box::new(crate::formats::csv::CsvFormatter),
            OutputFormat::Json => Box::new(crate::formats::json::JsonFormatter),
            OutputFormat::Jsonl => Box::new(crate::formats::jsonl::JsonlFormatter),
        };

        Self {
            formatter,
            destination,
        }
    }

    /// Write records to the configured destination
    pub fn write_records(&self, records: &[SocketRecord]) -> Result<()> {
        let content = self.formatter.format_records(records)?;

        match &self.destination {
            OutputDestination::Stdout => {
                println!("{}", content);
            }
            OutputDestination::File(path) => {
                std::fs::write(path, content)?;
            }
        }

        Ok(())
    }
}

/// Start time column value, empty for records that were never enriched.
pub(crate) fn started_at_text(record: &SocketRecord) -> String {
    record
        .started_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

//! JSONL (JSON Lines) output formatter for the listening port inventory
use crate::error::Result;
use crate::formats::traits::OutputFormatter;
use crate::netstat::SocketRecord;

/// JSONL formatter that outputs data as JSON objects, one per line
pub struct JsonlFormatter;

impl OutputFormatter for JsonlFormatter {
    fn format_records(&self, records: &[SocketRecord]) -> Result<String> {
        let mut output = String::new();

        for record in records {
            let line = serde_json::to_string(record)?;
            output.push_str(&line);
            output.push('\n');
        }

        Ok(output)
    }
}

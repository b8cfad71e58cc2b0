//! JSON output formatter for the listening port inventory
use crate::error::Result;
use crate::formats::traits::OutputFormatter;
use crate::netstat::SocketRecord;

#[derive(serde::Serialize)]
struct OutputWrapper<'a, T> {
    timestamp: String,
    count: usize,
    results: &'a [T],
}

/// JSON formatter that outputs data in JSON format with metadata
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_records(&self, records: &[SocketRecord]) -> Result<String> {
        let wrapper = OutputWrapper {
            timestamp: chrono::Utc::now().to_rfc3339(),
            count: records.len(),
            results: records,
        };

        let json = serde_json::to_string_pretty(&wrapper)?;
        Ok(json)
    }
}

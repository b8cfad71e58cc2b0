//! CSV output formatter for the listening port inventory
use crate::error::Result;
use crate::formats::traits::{started_at_text, OutputFormatter};
use crate::netstat::SocketRecord;
use csv::Writer;

/// CSV formatter that outputs data in comma-separated values format
pub struct CsvFormatter;

impl OutputFormatter for CsvFormatter {
    fn format_records(&self, records: &[SocketRecord]) -> Result<String> {
        let mut wtr = Writer::from_writer(vec![]);

        wtr.write_record([
            "port",
            "address",
            "_type",
            "pid",
            "process_name",
            "user",
            "root_dir",
            "uptime",
        ])?;

        for record in records {
            wtr.write_record(&[
                record.port.to_string(),
                record.address.clone(),
                record.address_family.to_string(),
                record.pid.to_string(),
                record.process_name.clone(),
                record.owner.clone(),
                record.root_dir.clone(),
                started_at_text(record),
            ])?;
        }

        wtr.flush()?;
        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }
}

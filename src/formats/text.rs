//! Text (table) output formatter for the listening port inventory
use crate::error::Result;
use crate::formats::traits::{started_at_text, OutputFormatter};
use crate::netstat::SocketRecord;
use prettytable::{Cell, Row, Table};

/// Text formatter that outputs data in a human-readable table format
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format_records(&self, records: &[SocketRecord]) -> Result<String> {
        let mut table = Table::new();
        table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

        table.set_titles(Row::new(vec![
            Cell::new("PROTO").style_spec("c"),
            Cell::new("ADDRESS").style_spec("c"),
            Cell::new("PORT").style_spec("c"),
            Cell::new("PID").style_spec("c"),
            Cell::new("PROCESS").style_spec("c"),
            Cell::new("USER").style_spec("c"),
            Cell::new("ROOT_DIR").style_spec("c"),
            Cell::new("STARTED").style_spec("c"),
        ]));

        for record in records {
            table.add_row(Row::new(vec![
                Cell::new(record.address_family.as_str()),
                Cell::new(&record.address),
                Cell::new(&record.port.to_string()),
                Cell::new(&record.pid.to_string()),
                Cell::new(&record.process_name),
                Cell::new(&record.owner),
                Cell::new(&record.root_dir),
                Cell::new(&started_at_text(record)),
            ]));
        }

        Ok(table.to_string())
    }
}

//! Collects the enriched listening socket inventory
use crate::error::{InventoryError, Result};
use crate::netstat::{parse_listening_sockets, ReportSource, SocketRecord};
use crate::process::{enrich_all, ProcessTable};

/// The finished records plus the per-record enrichment failures.
#[derive(Debug)]
pub struct Collection {
    pub records: Vec<SocketRecord>,
    pub errors: Vec<InventoryError>,
}

/// Read the socket report, parse it, then enrich each record.
///
/// Only a failure to obtain or parse the report is fatal. Records whose
/// enrichment failed are still returned with their report fields.
pub fn collect(source: &dyn ReportSource, table: &mut dyn ProcessTable) -> Result<Collection> {
    let report = source.read()?;
    let mut records = parse_listening_sockets(&report)?;
    log::info!("found {} listening sockets", records.len());

    let errors = enrich_all(&mut records, table);
    Ok(Collection { records, errors })
}

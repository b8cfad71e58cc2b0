//! SQLite inventory store, upserting listening sockets by port
use crate::config::{validate_table_name, DatabaseConfig};
use crate::error::Result;
use crate::netstat::SocketRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// A persisted inventory row.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRow {
    pub port: u16,
    pub address: String,
    pub address_type: String,
    pub pid: u32,
    pub process_name: String,
    pub root_dir: String,
    pub user: String,
    pub uptime: Option<DateTime<Utc>>,
}

impl From<&SocketRecord> for InventoryRow {
    fn from(record: &SocketRecord) -> Self {
        Self {
            port: record.port,
            address: record.address.clone(),
            address_type: record.address_family.as_str().to_string(),
            pid: record.pid,
            process_name: record.process_name.clone(),
            root_dir: record.root_dir.clone(),
            user: record.owner.clone(),
            uptime: record.started_at,
        }
    }
}

/// Outcome of one synchronization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

enum Outcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Connection to the inventory table.
pub struct Inventory {
    conn: Connection,
    table: String,
}

impl Inventory {
    /// Open (or create) the database file and make sure the table exists.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let conn = Connection::open(&config.db_name)?;
        log::debug!("opened inventory database {}", config.db_name);
        Self::with_connection(conn, &config.tb_name)
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let inventory = Inventory {
            conn,
            table: table.to_string(),
        };
        inventory.migrate()?;
        Ok(inventory)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                port INTEGER NOT NULL PRIMARY KEY,
                address TEXT NOT NULL,
                _type TEXT NOT NULL,
                pid INTEGER NOT NULL,
                process_name TEXT NOT NULL,
                root_dir TEXT NOT NULL,
                user TEXT NOT NULL,
                uptime TEXT
            );",
            self.table
        ))?;
        Ok(())
    }

    /// Upsert every record by port. Each record is written on its own, so a
    /// failing row is counted and logged without affecting its siblings.
    pub fn sync(&self, records: &[SocketRecord]) -> SyncReport {
        let mut report = SyncReport::default();

        for record in records {
            match self.upsert(&InventoryRow::from(record)) {
                Ok(Outcome::Inserted) => report.inserted += 1,
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    log::error!("store port {} failed: {}", record.port, e);
                    report.failed += 1;
                }
            }
        }

        log::info!(
            "inventory sync: {} inserted, {} updated, {} unchanged, {} failed",
            report.inserted,
            report.updated,
            report.unchanged,
            report.failed
        );
        report
    }

    fn upsert(&self, row: &InventoryRow) -> Result<Outcome> {
        match self.find(row.port)? {
            None => {
                self.conn.execute(
                    &format!(
                        "INSERT INTO {} (port, address, _type, pid, process_name, root_dir, user, uptime)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        self.table
                    ),
                    params![
                        row.port,
                        row.address,
                        row.address_type,
                        row.pid,
                        row.process_name,
                        row.root_dir,
                        row.user,
                        row.uptime.map(|t| t.to_rfc3339()),
                    ],
                )?;
                Ok(Outcome::Inserted)
            }
            Some(existing) if existing == *row => Ok(Outcome::Unchanged),
            Some(_) => {
                self.conn.execute(
                    &format!(
                        "UPDATE {} SET address = ?2, _type = ?3, pid = ?4, process_name = ?5,
                         root_dir = ?6, user = ?7, uptime = ?8 WHERE port = ?1",
                        self.table
                    ),
                    params![
                        row.port,
                        row.address,
                        row.address_type,
                        row.pid,
                        row.process_name,
                        row.root_dir,
                        row.user,
                        row.uptime.map(|t| t.to_rfc3339()),
                    ],
                )?;
                Ok(Outcome::Updated)
            }
        }
    }

    /// Look up the persisted row for a port.
    pub fn find(&self, port: u16) -> Result<Option<InventoryRow>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT port, address, _type, pid, process_name, root_dir, user, uptime
                     FROM {} WHERE port = ?1",
                    self.table
                ),
                params![port],
                read_row,
            )
            .optional()?;
        Ok(row)
    }

    /// All persisted rows ordered by port.
    pub fn rows(&self) -> Result<Vec<InventoryRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT port, address, _type, pid, process_name, root_dir, user, uptime
             FROM {} ORDER BY port",
            self.table
        ))?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InventoryRow> {
    let uptime: Option<String> = row.get(7)?;
    let uptime = match uptime {
        Some(text) => Some(
            DateTime::parse_from_rfc3339(&text)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
                })?,
        ),
        None => None,
    };

    Ok(InventoryRow {
        port: row.get(0)?,
        address: row.get(1)?,
        address_type: row.get(2)?,
        pid: row.get(3)?,
        process_name: row.get(4)?,
        root_dir: row.get(5)?,
        user: row.get(6)?,
        uptime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netstat::AddressFamily;

    fn redis() -> SocketRecord {
        let mut r = SocketRecord::new(6379, "0.0.0.0", AddressFamily::Ipv4, 15238, "redis-server");
        r.owner = "redis".to_string();
        r.root_dir = "/var/lib/redis".to_string();
        r.started_at = DateTime::from_timestamp(1_559_458_320, 0);
        r
    }

    #[test]
    fn inserts_then_leaves_unchanged_rows_alone() {
        let store = Inventory::open_in_memory("listening_ports").unwrap();
        let records = vec![
            redis(),
            SocketRecord::new(22, "0.0.0.0", AddressFamily::Ipv4, 0, "sshd"),
        ];

        let first = store.sync(&records);
        assert_eq!(first.inserted, 2);
        assert_eq!(first.failed, 0);

        let second = store.sync(&records);
        assert_eq!(
            second,
            SyncReport {
                inserted: 0,
                updated: 0,
                unchanged: 2,
                failed: 0
            }
        );
        assert_eq!(store.rows().unwrap().len(), 2);
    }

    #[test]
    fn existing_port_is_updated_in_place() {
        let store = Inventory::open_in_memory("listening_ports").unwrap();
        store.sync(&[redis()]);

        let mut moved = redis();
        moved.pid = 20001;
        moved.address = "::".to_string();
        moved.address_family = AddressFamily::Ipv6;
        let report = store.sync(&[moved]);
        assert_eq!(report.updated, 1);

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pid, 20001);
        assert_eq!(rows[0].address_type, "IPV6");
        assert_eq!(rows[0].user, "redis");
        assert_eq!(rows[0].uptime.unwrap().timestamp(), 1_559_458_320);
    }

    #[test]
    fn duplicate_ports_in_one_batch_collapse_to_last_writer() {
        let store = Inventory::open_in_memory("ports").unwrap();
        let v4 = SocketRecord::new(22, "0.0.0.0", AddressFamily::Ipv4, 640, "sshd");
        let v6 = SocketRecord::new(22, "::", AddressFamily::Ipv6, 640, "sshd");

        let report = store.sync(&[v4, v6]);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(store.find(22).unwrap().unwrap().address, "::");
    }

    #[test]
    fn unenriched_record_has_no_uptime() {
        let store = Inventory::open_in_memory("ports").unwrap();
        store.sync(&[SocketRecord::new(111, "0.0.0.0", AddressFamily::Ipv4, 0, "rpcbind")]);
        let row = store.find(111).unwrap().unwrap();
        assert!(row.uptime.is_none());
        assert!(row.user.is_empty());
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(Inventory::open_in_memory("ports; DROP TABLE x").is_err());
    }

    #[test]
    fn dual_stack_port_rewrites_but_keeps_rows_stable() {
        let store = Inventory::open_in_memory("ports").unwrap();
        let batch = [
            SocketRecord::new(22, "0.0.0.0", AddressFamily::Ipv4, 640, "sshd"),
            SocketRecord::new(22, "::", AddressFamily::Ipv6, 640, "sshd"),
        ];

        store.sync(&batch);
        let before = store.rows().unwrap();
        let report = store.sync(&batch);
        assert_eq!(report.updated, 2);
        assert_eq!(report.inserted, 0);
        assert_eq!(store.rows().unwrap(), before);
    }
}

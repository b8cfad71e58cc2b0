//! Process metadata enrichment for listening sockets
use crate::error::{InventoryError, Result};
use crate::netstat::SocketRecord;
use chrono::{DateTime, Utc};
use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind, Users};

/// Per-pid queries against the OS process table. Each query may fail on
/// its own, e.g. when the process exited or access is denied.
pub trait ProcessTable {
    fn username(&mut self, pid: u32) -> Result<String>;
    fn cwd(&mut self, pid: u32) -> Result<String>;
    /// Creation time in milliseconds since the Unix epoch.
    fn create_time_ms(&mut self, pid: u32) -> Result<i64>;
    fn name(&mut self, pid: u32) -> Result<String>;
}

/// Process table backed by `sysinfo`.
pub struct SystemProcessTable {
    system: System,
    users: Users,
    loaded: Option<u32>,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            users: Users::new_with_refreshed_list(),
            loaded: None,
        }
    }

    fn process(&mut self, pid: u32, field: &'static str) -> Result<&sysinfo::Process> {
        let sys_pid = Pid::from_u32(pid);
        if self.loaded != Some(pid) {
            let kind = ProcessRefreshKind::new()
                .with_cwd(UpdateKind::Always)
                .with_exe(UpdateKind::Always)
                .with_cmd(UpdateKind::Always)
                .with_user(UpdateKind::Always);
            self.system.refresh_process_specifics(sys_pid, kind);
            self.loaded = Some(pid);
        }
        self.system
            .process(sys_pid)
            .ok_or_else(|| lookup_error(pid, field, "process not found"))
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn username(&mut self, pid: u32) -> Result<String> {
        let uid = self
            .process(pid, "username")?
            .user_id()
            .cloned()
            .ok_or_else(|| lookup_error(pid, "username", "owner unavailable"))?;

        self.users
            .get_user_by_id(&uid)
            .map(|user| user.name().to_string())
            .ok_or_else(|| lookup_error(pid, "username", format!("unknown uid {:?}", uid)))
    }

    fn cwd(&mut self, pid: u32) -> Result<String> {
        let cwd = self
            .process(pid, "current workspace directory")?
            .cwd()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                lookup_error(
                    pid,
                    "current workspace directory",
                    "permission denied or process gone",
                )
            })?;
        Ok(cwd.display().to_string())
    }

    fn create_time_ms(&mut self, pid: u32) -> Result<i64> {
        let secs = self.process(pid, "uptime")?.start_time();
        i64::try_from(secs)
            .map(|s| s.saturating_mul(1000))
            .map_err(|_| lookup_error(pid, "uptime", "start time out of range"))
    }

    fn name(&mut self, pid: u32) -> Result<String> {
        let process = self.process(pid, "process name")?;
        let exe_name = process
            .exe()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        let arg0_name = process.cmd().first().and_then(|arg| {
            std::path::Path::new(arg)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        });
        Ok(full_name(process.name(), [exe_name, arg0_name]))
    }
}

/// Longest name the kernel keeps for a task (`TASK_COMM_LEN - 1`).
const COMM_LEN: usize = 15;

/// Recover a name the kernel cut to `COMM_LEN` bytes from the executable
/// or first argument, when one of them extends the short name.
fn full_name(short: &str, candidates: [Option<String>; 2]) -> String {
    if short.len() < COMM_LEN {
        return short.to_string();
    }
    candidates
        .into_iter()
        .flatten()
        .find(|candidate| candidate.len() > short.len() && candidate.starts_with(short))
        .unwrap_or_else(|| short.to_string())
}

fn lookup_error(pid: u32, field: &'static str, reason: impl Into<String>) -> InventoryError {
    InventoryError::ProcessLookup {
        pid,
        field,
        reason: reason.into(),
    }
}

/// Convert epoch milliseconds to a point in time, truncated to the second.
pub fn created_at(pid: u32, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(millis.div_euclid(1000), 0)
        .ok_or_else(|| lookup_error(pid, "uptime", format!("invalid timestamp {}", millis)))
}

/// Fill in owner, working directory, start time and process name.
///
/// The four lookups run in order and the first failure aborts the record.
/// Nothing is written to the record unless every lookup succeeded.
pub fn enrich(record: &mut SocketRecord, table: &mut dyn ProcessTable) -> Result<()> {
    if record.pid == 0 {
        return Err(InventoryError::InvalidRecord { port: record.port });
    }
    let pid = record.pid;

    let owner = table.username(pid)?;
    let root_dir = table.cwd(pid)?;
    let started_at = created_at(pid, table.create_time_ms(pid)?)?;
    let process_name = table.name(pid)?;

    record.owner = owner;
    record.root_dir = root_dir;
    record.started_at = Some(started_at);
    record.process_name = process_name;
    Ok(())
}

/// Enrich every record, collecting per-record failures instead of stopping.
pub fn enrich_all(records: &mut [SocketRecord], table: &mut dyn ProcessTable) -> Vec<InventoryError> {
    let mut errors = Vec::new();

    for record in records.iter_mut() {
        if let Err(e) = enrich(record, table) {
            log::warn!("port {} (pid {}): {}", record.port, record.pid, e);
            errors.push(e);
        }
    }

    log::info!(
        "enriched {} of {} listening sockets",
        records.len() - errors.len(),
        records.len()
    );
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netstat::AddressFamily;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct Entry {
        user: Option<&'static str>,
        cwd: Option<&'static str>,
        created_ms: Option<i64>,
        name: Option<&'static str>,
    }

    impl Entry {
        fn full(name: &'static str) -> Self {
            Entry {
                user: Some("redis"),
                cwd: Some("/var/lib/redis"),
                created_ms: Some(1_559_458_320_789),
                name: Some(name),
            }
        }
    }

    #[derive(Default)]
    struct FakeTable {
        entries: HashMap<u32, Entry>,
        calls: Vec<(u32, &'static str)>,
    }

    impl FakeTable {
        fn get<T>(
            &mut self,
            pid: u32,
            field: &'static str,
            pick: impl Fn(&Entry) -> Option<T>,
        ) -> Result<T> {
            self.calls.push((pid, field));
            self.entries
                .get(&pid)
                .and_then(pick)
                .ok_or_else(|| lookup_error(pid, field, "no such process"))
        }
    }

    impl ProcessTable for FakeTable {
        fn username(&mut self, pid: u32) -> Result<String> {
            self.get(pid, "username", |e| e.user.map(String::from))
        }
        fn cwd(&mut self, pid: u32) -> Result<String> {
            self.get(pid, "cwd", |e| e.cwd.map(String::from))
        }
        fn create_time_ms(&mut self, pid: u32) -> Result<i64> {
            self.get(pid, "create_time", |e| e.created_ms)
        }
        fn name(&mut self, pid: u32) -> Result<String> {
            self.get(pid, "name", |e| e.name.map(String::from))
        }
    }

    fn record(port: u16, pid: u32) -> SocketRecord {
        SocketRecord::new(port, "0.0.0.0", AddressFamily::Ipv4, pid, "from-report")
    }

    #[test]
    fn enriches_all_fields() {
        let mut table = FakeTable::default();
        table.entries.insert(15238, Entry::full("redis-server"));

        let mut r = record(6379, 15238);
        enrich(&mut r, &mut table).unwrap();

        assert_eq!(r.owner, "redis");
        assert_eq!(r.root_dir, "/var/lib/redis");
        assert_eq!(r.process_name, "redis-server");
        assert_eq!(r.started_at.unwrap().timestamp(), 1_559_458_320);
        assert_eq!(r.port, 6379);
        assert_eq!(r.address, "0.0.0.0");
    }

    #[test]
    fn zero_pid_is_rejected_without_lookups() {
        let mut table = FakeTable::default();
        let mut r = record(111, 0);
        let before = r.clone();

        let err = enrich(&mut r, &mut table).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidRecord { port: 111 }));
        assert_eq!(r, before);
        assert!(table.calls.is_empty());
    }

    #[test]
    fn first_failing_lookup_stops_and_leaves_record_untouched() {
        let mut table = FakeTable::default();
        let mut entry = Entry::full("redis-server");
        entry.cwd = None;
        table.entries.insert(42, entry);

        let mut r = record(6379, 42);
        let before = r.clone();
        let err = enrich(&mut r, &mut table).unwrap_err();

        match err {
            InventoryError::ProcessLookup { pid, field, .. } => {
                assert_eq!(pid, 42);
                assert_eq!(field, "cwd");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(r, before);
        assert_eq!(table.calls, vec![(42, "username"), (42, "cwd")]);
    }

    #[test]
    fn one_failure_in_ten_does_not_stop_the_batch() {
        let mut table = FakeTable::default();
        let mut records = Vec::new();
        for i in 0..10u32 {
            let pid = 100 + i;
            if i != 4 {
                table.entries.insert(pid, Entry::full("svc"));
            }
            records.push(record(8000 + i as u16, pid));
        }

        let errors = enrich_all(&mut records, &mut table);

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            InventoryError::ProcessLookup { pid: 104, .. }
        ));
        let enriched = records.iter().filter(|r| r.started_at.is_some()).count();
        assert_eq!(enriched, 9);
        assert_eq!(records[4].process_name, "from-report");
        assert_eq!(records.len(), 10);
    }

    #[test]
    fn pre_epoch_millis_round_down() {
        assert_eq!(created_at(1, -1).unwrap().timestamp(), -1);
        assert_eq!(created_at(1, 1999).unwrap().timestamp(), 1);
    }

    #[test]
    fn truncated_names_are_restored() {
        let exe = Some("systemd-resolved".to_string());
        assert_eq!(full_name("systemd-resolve", [exe, None]), "systemd-resolved");
        assert_eq!(
            full_name("listening_port-", [None, Some("listening_port-0123abcd".to_string())]),
            "listening_port-0123abcd"
        );
        assert_eq!(full_name("redis-server", [Some("other".to_string()), None]), "redis-server");
        assert_eq!(
            full_name("abcdefghijklmno", [Some("unrelated-binary".to_string()), None]),
            "abcdefghijklmno"
        );
    }

    #[test]
    fn enriches_own_process_from_system_table() {
        let mut table = SystemProcessTable::new();
        let mut r = record(8080, std::process::id());
        enrich(&mut r, &mut table).unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(r.root_dir, cwd.display().to_string());
        assert!(!r.owner.is_empty());
        assert!(!r.process_name.is_empty());
        assert_ne!(r.process_name, "from-report");

        let started = r.started_at.unwrap();
        assert!(started <= Utc::now());
        assert!(started.timestamp() > 1_000_000_000);
    }

    #[test]
    fn missing_pid_fails_on_system_table() {
        let mut table = SystemProcessTable::new();
        let mut r = record(8080, u32::MAX);
        let before = r.clone();

        let err = enrich(&mut r, &mut table).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::ProcessLookup { field: "username", .. }
        ));
        assert_eq!(r, before);
    }
}

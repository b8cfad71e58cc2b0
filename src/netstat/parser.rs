//! Listening socket parser for netstat reports
use crate::error::Result;
use crate::netstat::{AddressFamily, SocketRecord};
use regex::Regex;

// tcp    0    0 0.0.0.0:6379    0.0.0.0:*    LISTEN    15238/redis-server
// groups: 1 protocol, 2 address, 3 port, 4 pid, 5 process name
const LISTEN_LINE: &str = r"^(tcp\d?)\s+0\s+0\s+(\S+):(\d+)\s+\S+\s+LISTEN\s+(\d+)/(\S+)";

/// Extract listening TCP sockets from a raw netstat report.
///
/// Lines that do not match the listening row shape are skipped, as are
/// rows whose port or pid do not parse. Records keep report order.
pub fn parse_listening_sockets(report: &[u8]) -> Result<Vec<SocketRecord>> {
    let re = Regex::new(LISTEN_LINE)?;
    let text = String::from_utf8_lossy(report);

    let records: Vec<SocketRecord> = text
        .lines()
        .filter_map(|line| parse_line(&re, line))
        .collect();

    log::trace!("matched {} listening socket lines", records.len());
    Ok(records)
}

fn parse_line(re: &Regex, line: &str) -> Option<SocketRecord> {
    let caps = re.captures(line)?;

    let port = caps[3].parse::<u16>().ok()?;
    let pid = caps[4].parse::<u32>().ok()?;

    Some(SocketRecord::new(
        port,
        &caps[2],
        AddressFamily::from_protocol(&caps[1]),
        pid,
        &caps[5],
    ))
}

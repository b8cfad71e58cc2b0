//! Listening socket model and the socket report reader
use crate::error::{InventoryError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Command;

pub mod parser;

pub use parser::parse_listening_sockets;

/// Default location of the network status tool.
pub const DEFAULT_NETSTAT: &str = "/usr/bin/netstat";

/// Listening sockets, TCP only, numeric ports and hosts, with owning pid.
pub const NETSTAT_ARGS: [&str; 3] = ["-ltp", "--numeric-ports", "--numeric-hosts"];

/// Address family of a listening socket.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    #[serde(rename = "IPV4")]
    Ipv4,
    #[serde(rename = "IPV6")]
    Ipv6,
}

impl AddressFamily {
    /// Classify a protocol token. Only the bare `tcp` token is IPv4.
    pub fn from_protocol(token: &str) -> Self {
        if token == "tcp" {
            AddressFamily::Ipv4
        } else {
            AddressFamily::Ipv6
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "IPV4",
            AddressFamily::Ipv6 => "IPV6",
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed listening socket and, once enriched, its owning process.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SocketRecord {
    pub port: u16,
    pub address: String,
    #[serde(rename = "_type")]
    pub address_family: AddressFamily,
    pub pid: u32,
    pub process_name: String,
    #[serde(rename = "user")]
    pub owner: String,
    pub root_dir: String,
    #[serde(rename = "uptime")]
    pub started_at: Option<DateTime<Utc>>,
}

impl SocketRecord {
    /// Create a record carrying only the fields found in the socket report.
    pub fn new(
        port: u16,
        address: impl Into<String>,
        address_family: AddressFamily,
        pid: u32,
        process_name: impl Into<String>,
    ) -> Self {
        Self {
            port,
            address: address.into(),
            address_family,
            pid,
            process_name: process_name.into(),
            owner: String::new(),
            root_dir: String::new(),
            started_at: None,
        }
    }
}

/// Anything that can produce a raw socket report.
pub trait ReportSource {
    fn read(&self) -> Result<Vec<u8>>;
}

/// Runs the host's netstat with fixed arguments.
#[derive(Debug, Clone)]
pub struct NetstatCommand {
    program: PathBuf,
}

impl NetstatCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl Default for NetstatCommand {
    fn default() -> Self {
        Self::new(DEFAULT_NETSTAT)
    }
}

impl ReportSource for NetstatCommand {
    fn read(&self) -> Result<Vec<u8>> {
        log::debug!(
            "running {} {}",
            self.program.display(),
            NETSTAT_ARGS.join(" ")
        );

        let output = Command::new(&self.program)
            .args(NETSTAT_ARGS)
            .output()
            .map_err(|e| {
                InventoryError::Command(format!(
                    "cannot execute {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InventoryError::Command(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

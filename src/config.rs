//! Database configuration loaded from a YAML document
use crate::error::{InventoryError, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Default configuration file name.
pub const DEFAULT_CONFIG: &str = "config.yml";

/// Where the inventory is persisted.
///
/// `db_name` is the SQLite database file and `tb_name` the table. The
/// network fields are read so that existing documents still load, but the
/// SQLite store does not use them.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub db_name: String,
    pub tb_name: String,
}

impl DatabaseConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InventoryError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: DatabaseConfig = serde_yaml::from_str(content)?;
        config.validate()?;

        if config.host.is_some()
            || config.port.is_some()
            || config.username.is_some()
            || config.password.is_some()
        {
            log::warn!("host, port and credentials are not used by the sqlite store");
        }
        Ok(config)
    }

    /// Database file name and table name must be usable as given.
    pub fn validate(&self) -> Result<()> {
        if self.db_name.trim().is_empty() {
            return Err(InventoryError::Configuration(
                "db_name must not be empty".to_string(),
            ));
        }
        validate_table_name(&self.tb_name)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(InventoryError::Configuration(format!(
            "invalid table name {:?}",
            name
        )))
    }
}

//! Error types for the listening port inventory
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    /// The socket report could not be produced.
    #[error("command error: {0}")]
    Command(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// A record that can never be enriched (pid 0).
    #[error("invalid record on port {port}: pid should not be empty")]
    InvalidRecord { port: u16 },

    #[error("get {field} of pid {pid} failed, msg={reason}")]
    ProcessLookup {
        pid: u32,
        field: &'static str,
        reason: String,
    },

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV into_inner error: {0}")]
    CsvIntoInner(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<regex::Error> for InventoryError {
    fn from(error: regex::Error) -> Self {
        InventoryError::Configuration(format!("invalid line pattern: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;

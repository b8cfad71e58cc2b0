//! Library crate for the listening port inventory

pub mod config;
pub mod error;
pub mod inventory;
pub mod netstat;
pub mod process;
pub mod store;

// CLI modules
pub mod cli {
    pub mod args;
}

// Format modules
pub mod formats {
    pub mod csv;
    pub mod json;
    pub mod jsonl;
    pub mod text;
    pub mod traits;
}

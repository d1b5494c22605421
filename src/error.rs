//! Error types for index construction and queries.

use cityquery_types::record::RecordId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CityQueryError>;

#[derive(Debug, Error)]
pub enum CityQueryError {
    /// Rejected argument: bad `k`, out-of-range coordinates, invalid config.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate record identifier: {0}")]
    DuplicateRecord(RecordId),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// Identifiers present in an index but missing from the record store.
    #[error("Index refers to {} record(s) missing from the store: {missing:?}", missing.len())]
    Inconsistent { missing: Vec<RecordId> },

    #[error("Invalid index file format")]
    InvalidFormat,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "snapshot")]
    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[cfg(feature = "toml")]
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

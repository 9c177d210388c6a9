//! Error types shared by the index, the store and the persistence layer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector must have at least one component")]
    EmptyVector,

    #[error("Vector component {index} is not a finite number")]
    NonFiniteValue { index: usize },

    #[error("ID not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization to '{}' failed: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("Deserialization of '{}' failed: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("'{}' is not a kvtree snapshot", .path.display())]
    NotASnapshot { path: PathBuf },

    #[error("Snapshot '{}' is inconsistent: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Unsupported snapshot version {found} in '{}'", .path.display())]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("Store has no persistence location")]
    NotBound,

    #[error("Invalid config file '{}': {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

//! Store configuration.

use crate::error::PersistenceError;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// When mutations are written to the persistence location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Every insert, delete and update flushes before returning.
    #[default]
    Immediate,
    /// Mutations only mark the store dirty; the caller flushes.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file. `None` keeps the store in memory only.
    pub location: Option<PathBuf>,
    pub flush_policy: FlushPolicy,
    /// Carry the old text payload over when `update` replaces the values.
    pub preserve_text_on_update: bool,
}

impl Default for StoreConfig {
    fn default() -> StoreConfig {
        StoreConfig {
            location: None,
            flush_policy: FlushPolicy::Immediate,
            preserve_text_on_update: true,
        }
    }
}

impl StoreConfig {
    pub fn at(location: impl Into<PathBuf>) -> StoreConfig {
        StoreConfig { location: Some(location.into()), ..StoreConfig::default() }
    }

    pub fn flush_policy(mut self, policy: FlushPolicy) -> StoreConfig {
        self.flush_policy = policy;
        self
    }

    pub fn preserve_text_on_update(mut self, preserve: bool) -> StoreConfig {
        self.preserve_text_on_update = preserve;
        self
    }

    /// Reads a JSON config file. Missing keys take their defaults.
    ///
    /// ```json
    /// { "location": "vectors.db", "flush_policy": "manual" }
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<StoreConfig, PersistenceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| PersistenceError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.location, None);
        assert_eq!(config.flush_policy, FlushPolicy::Immediate);
        assert!(config.preserve_text_on_update);
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::at("x.db")
            .flush_policy(FlushPolicy::Manual)
            .preserve_text_on_update(false);
        assert_eq!(config.location, Some(PathBuf::from("x.db")));
        assert_eq!(config.flush_policy, FlushPolicy::Manual);
        assert!(!config.preserve_text_on_update);
    }

    #[test]
    fn test_from_json_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kvtree.json");
        std::fs::write(&path, r#"{ "location": "vectors.db", "flush_policy": "manual" }"#).unwrap();

        let config = StoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.location, Some(PathBuf::from("vectors.db")));
        assert_eq!(config.flush_policy, FlushPolicy::Manual);
        assert!(config.preserve_text_on_update);
    }

    #[test]
    fn test_from_json_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            StoreConfig::from_json_file(&path),
            Err(PersistenceError::Config { .. })
        ));
    }

    #[test]
    fn test_from_json_file_missing() {
        assert!(matches!(
            StoreConfig::from_json_file("definitely_missing_config.json"),
            Err(PersistenceError::Io { .. })
        ));
    }
}

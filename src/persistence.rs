//! The persistence module
//! Load-or-create and atomic flush of a store's entries.
//!
//! A snapshot file is a 4-byte magic, a bincode `u32` format version and a
//! bincode body holding the established dimension and every entry in
//! enumeration order. The tree shape is not stored: `connect` rebuilds a
//! balanced index from the entries, which answers queries the same way.

use crate::config::StoreConfig;
use crate::error::{PersistenceError, Result};
use crate::kdtree::{Entry, KdTree};
use crate::store::VectorStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const MAGIC: &[u8; 4] = b"KVT\x01";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    dimension: Option<usize>,
    entries: Vec<&'a Entry>,
}

#[derive(Deserialize)]
struct Snapshot {
    dimension: Option<usize>,
    entries: Vec<Entry>,
}

/// Opens the store persisted at `location`, or an empty store bound to it
/// if nothing exists there yet.
///
/// # Examples
///
/// ```no_run
/// let mut store = kvtree::persistence::connect("vectors.db").unwrap();
/// store.insert(vec![1.0, 2.0, 3.0]).unwrap();
/// ```
pub fn connect(location: impl AsRef<Path>) -> Result<VectorStore> {
    connect_with(StoreConfig::at(location.as_ref()))
}

/// Like [`connect`], with full control over the store configuration. A
/// config without a location yields a fresh in-memory store.
pub fn connect_with(config: StoreConfig) -> Result<VectorStore> {
    let Some(location) = config.location.clone() else {
        return Ok(VectorStore::with_config(config));
    };

    let tree = match read_snapshot(&location)? {
        Some(snapshot) => restore_index(&location, snapshot)?,
        None => {
            info!(location = %location.display(), "no snapshot found, creating new store");
            KdTree::new()
        }
    };

    info!(location = %location.display(), entries = tree.len(), "store connected");
    Ok(VectorStore::from_parts(tree, config))
}

/// Writes every entry of `store` to `location`.
///
/// The snapshot goes to a temporary file in the same directory which is
/// synced and then renamed over `location`, so a failed write leaves the
/// previous snapshot intact.
pub fn flush(store: &VectorStore, location: &Path) -> std::result::Result<(), PersistenceError> {
    let io_err = |source: io::Error| PersistenceError::Io {
        path: location.to_path_buf(),
        source,
    };
    let encode_err = |source: bincode::Error| PersistenceError::Encode {
        path: location.to_path_buf(),
        source,
    };

    let dir = match location.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir).map_err(io_err)?;

    let snapshot = SnapshotRef {
        dimension: store.dimension(),
        entries: store.list(),
    };

    {
        let mut writer = BufWriter::new(temp.as_file());
        writer.write_all(MAGIC).map_err(io_err)?;
        bincode::serialize_into(&mut writer, &FORMAT_VERSION).map_err(encode_err)?;
        bincode::serialize_into(&mut writer, &snapshot).map_err(encode_err)?;
        writer.flush().map_err(io_err)?;
    }
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(location).map_err(|e| io_err(e.error))?;

    info!(location = %location.display(), entries = snapshot.entries.len(), "snapshot flushed");
    Ok(())
}

/// Rebuilds the index from a decoded snapshot. A snapshot that decodes but
/// could not have been written by a store is `Corrupt`.
fn restore_index(location: &Path, snapshot: Snapshot) -> std::result::Result<KdTree, PersistenceError> {
    let corrupt = |reason: String| PersistenceError::Corrupt {
        path: location.to_path_buf(),
        reason,
    };

    let mut seen = HashSet::with_capacity(snapshot.entries.len());
    if let Some(dup) = snapshot.entries.iter().find(|e| !seen.insert(e.id.as_str())) {
        return Err(corrupt(format!("duplicate id {}", dup.id)));
    }

    KdTree::build_with_dimension(snapshot.entries, snapshot.dimension)
        .map_err(|e| corrupt(e.to_string()))
}

fn read_snapshot(location: &Path) -> std::result::Result<Option<Snapshot>, PersistenceError> {
    let io_err = |source: io::Error| PersistenceError::Io {
        path: location.to_path_buf(),
        source,
    };
    let decode_err = |source: bincode::Error| PersistenceError::Decode {
        path: location.to_path_buf(),
        source,
    };

    let file = match File::open(location) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(e)),
    };
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    match reader.read_exact(&mut magic) {
        Ok(()) if &magic == MAGIC => {}
        Ok(()) => return Err(PersistenceError::NotASnapshot { path: location.to_path_buf() }),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(PersistenceError::NotASnapshot { path: location.to_path_buf() });
        }
        Err(e) => return Err(io_err(e)),
    }

    let version: u32 = bincode::deserialize_from(&mut reader).map_err(decode_err)?;
    if version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            path: location.to_path_buf(),
            found: version,
        });
    }

    let snapshot: Snapshot = bincode::deserialize_from(&mut reader).map_err(decode_err)?;
    debug!(location = %location.display(), entries = snapshot.entries.len(), "snapshot read");
    Ok(Some(snapshot))
}

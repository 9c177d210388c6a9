//! # KVTREE - A Persistent KD-Tree Vector Store
//!
//! KVTREE indexes fixed-dimension vectors in a KD-tree and answers exact
//! k-nearest-neighbor queries by Euclidean distance. Each entry gets a
//! generated ID and may carry a text payload. A store bound to a file
//! location flushes a snapshot after every mutation and reloads it on
//! connect.
//!
//! ## Example
//!
//! ```
//! use kvtree::VectorStore;
//!
//! let mut store = VectorStore::new();
//!
//! // Insert vectors
//! let a = store.insert(vec![1.0, 2.0, 3.0]).unwrap();
//! store.insert(vec![4.0, 5.0, 6.0]).unwrap();
//! store.insert_with_text(vec![7.0, 8.0, 9.0], "far away").unwrap();
//!
//! // Search for the nearest vectors
//! let hits = store.k_nearest(&[1.0, 2.0, 3.0], 2).unwrap();
//! assert_eq!(hits[0].entry.id, a); // Closest vector
//! assert_eq!(hits[0].distance, 0.0);
//! ```

pub mod config;
pub mod error;
pub mod kdtree;
pub mod persistence;
pub mod text;
pub mod vector;
mod store;

pub use config::{FlushPolicy, StoreConfig};
pub use error::{PersistenceError, Result, StoreError};
pub use kdtree::{Entry, KdTree, Neighbor};
pub use store::VectorStore;

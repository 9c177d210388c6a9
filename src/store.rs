//! The store module
//! Provide CRUD and k-nearest search over a KD-tree index, with generated
//! IDs and flush-on-mutation persistence

use crate::config::{FlushPolicy, StoreConfig};
use crate::error::{PersistenceError, Result, StoreError};
use crate::kdtree::{Entry, KdTree, Neighbor};
use crate::persistence;
use crate::vector::check_dimension;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

fn uuid_v4() -> String {
    Uuid::new_v4().to_string()
}

pub struct VectorStore {
    tree: KdTree,
    config: StoreConfig,
    dirty: bool,
    id_source: fn() -> String,
}

impl Default for VectorStore {
    fn default() -> VectorStore {
        VectorStore::new()
    }
}

impl VectorStore {
    /// Creates a new empty in-memory store.
    ///
    /// The store starts with no dimension constraint. The dimension is set
    /// by the first insert.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::VectorStore;
    ///
    /// let store = VectorStore::new();
    /// assert_eq!(store.count(), 0);
    /// ```
    pub fn new() -> VectorStore {
        VectorStore::with_config(StoreConfig::default())
    }

    /// Creates a new empty store with `config`. Nothing is read from the
    /// configured location; use [`VectorStore::open`] for load-or-create.
    pub fn with_config(config: StoreConfig) -> VectorStore {
        VectorStore::from_parts(KdTree::new(), config)
    }

    pub(crate) fn from_parts(tree: KdTree, config: StoreConfig) -> VectorStore {
        VectorStore { tree, config, dirty: false, id_source: uuid_v4 }
    }

    /// Loads the store persisted at `location`, or starts an empty one
    /// bound to it.
    pub fn connect(location: impl AsRef<Path>) -> Result<VectorStore> {
        persistence::connect(location)
    }

    /// Load-or-create with a full configuration.
    pub fn open(config: StoreConfig) -> Result<VectorStore> {
        persistence::connect_with(config)
    }

    /// Replaces the ID generator (random UUID v4 by default).
    pub fn with_id_source(mut self, id_source: fn() -> String) -> VectorStore {
        self.id_source = id_source;
        self
    }

    /// Inserts a vector under a freshly generated ID and returns the ID.
    ///
    /// The first insert fixes the store's dimension.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - the vector length differs from the store's
    /// * `EmptyVector` - the vector has no components
    /// * `NonFiniteValue` - a component is NaN or infinite
    /// * `Persistence` - the flush failed; the insert is rolled back
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::{StoreError, VectorStore};
    ///
    /// let mut store = VectorStore::new();
    /// let id = store.insert(vec![1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(store.get(&id).unwrap().values, vec![1.0, 2.0, 3.0]);
    ///
    /// let result = store.insert(vec![1.0, 2.0]);
    /// assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    /// ```
    pub fn insert(&mut self, values: Vec<f32>) -> Result<String> {
        self.insert_entry(values, None)
    }

    /// Inserts a vector carrying an opaque text payload.
    pub fn insert_with_text(&mut self, values: Vec<f32>, text: impl Into<String>) -> Result<String> {
        self.insert_entry(values, Some(text.into()))
    }

    fn insert_entry(&mut self, values: Vec<f32>, text: Option<String>) -> Result<String> {
        let prior_dimension = self.tree.dimension();
        check_dimension(&values, prior_dimension)?;

        let id = (self.id_source)();
        self.tree.insert(Entry { id: id.clone(), values, text })?;
        debug!(id = %id, count = self.tree.len(), "inserted");

        if let Err(e) = self.commit() {
            warn!(id = %id, error = %e, "flush failed, rolling back insert");
            self.tree.remove(&id);
            if prior_dimension.is_none() {
                self.tree.forget_dimension();
            }
            return Err(e);
        }

        Ok(id)
    }

    /// Retrieves an entry by its ID.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::{StoreError, VectorStore};
    ///
    /// let mut store = VectorStore::new();
    /// let id = store.insert_with_text(vec![3.0, 4.0], "note").unwrap();
    ///
    /// assert_eq!(store.get(&id).unwrap().text.as_deref(), Some("note"));
    /// assert!(matches!(store.get("missing"), Err(StoreError::NotFound(_))));
    /// ```
    pub fn get(&self, id: &str) -> Result<&Entry> {
        self.tree
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Deletes an entry by its ID.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::VectorStore;
    ///
    /// let mut store = VectorStore::new();
    /// let a = store.insert(vec![1.0, 2.0]).unwrap();
    /// store.insert(vec![3.0, 4.0]).unwrap();
    ///
    /// store.delete(&a).unwrap();
    /// assert!(store.get(&a).is_err());
    /// assert_eq!(store.count(), 1);
    ///
    /// assert!(store.delete(&a).is_err());
    /// ```
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let removed = self
            .tree
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        debug!(id = %id, count = self.tree.len(), "deleted");

        if let Err(e) = self.commit() {
            warn!(id = %id, error = %e, "flush failed, rolling back delete");
            self.restore(removed);
            return Err(e);
        }

        Ok(())
    }

    /// Replaces the values stored under `id`.
    ///
    /// The old entry is removed and a new one with the same ID is inserted,
    /// so it may land anywhere in the tree. Whether the text payload is
    /// carried over is controlled by
    /// [`StoreConfig::preserve_text_on_update`].
    pub fn update(&mut self, id: &str, values: Vec<f32>) -> Result<()> {
        check_dimension(&values, self.tree.dimension())?;

        let old = self
            .tree
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let text = if self.config.preserve_text_on_update {
            old.text.clone()
        } else {
            None
        };
        self.tree.insert(Entry { id: id.to_string(), values, text })?;
        debug!(id = %id, "updated");

        if let Err(e) = self.commit() {
            warn!(id = %id, error = %e, "flush failed, rolling back update");
            self.tree.remove(id);
            self.restore(old);
            return Err(e);
        }

        Ok(())
    }

    /// Returns the `k` entries nearest to `query` by Euclidean distance,
    /// closest first. `k` is clamped to the number of stored entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::VectorStore;
    ///
    /// let mut store = VectorStore::new();
    /// let a = store.insert(vec![1.0, 2.0, 3.0]).unwrap();
    /// store.insert(vec![4.0, 5.0, 6.0]).unwrap();
    /// let c = store.insert(vec![7.0, 8.0, 9.0]).unwrap();
    ///
    /// let hits = store.k_nearest(&[1.0, 2.0, 3.0], 5).unwrap();
    /// assert_eq!(hits.len(), 3);
    /// assert_eq!(hits[0].entry.id, a);
    /// assert_eq!(hits[2].entry.id, c);
    /// assert!((hits[2].distance - 108f32.sqrt()).abs() < 1e-5);
    /// ```
    pub fn k_nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let hits = self.tree.k_nearest(query, k.min(self.tree.len()))?;
        debug!(k, hits = hits.len(), "k-nearest search");
        Ok(hits)
    }

    /// Returns every entry, in index traversal order.
    pub fn list(&self) -> Vec<&Entry> {
        self.tree.entries()
    }

    /// Returns the number of entries in the store.
    pub fn count(&self) -> usize {
        self.tree.len()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.tree.dimension()
    }

    /// The underlying index, for diagnostics.
    pub fn index(&self) -> &KdTree {
        &self.tree
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// True when mutations have not been flushed yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebalances the index by rebuilding it from its own entries.
    ///
    /// Entries are unchanged, so nothing needs flushing.
    pub fn rebuild(&mut self) -> Result<()> {
        let entries: Vec<Entry> = self.tree.entries().into_iter().cloned().collect();
        let depth_before = self.tree.depth();
        self.tree = KdTree::build_with_dimension(entries, self.tree.dimension())?;
        debug!(depth_before, depth_after = self.tree.depth(), "index rebuilt");
        Ok(())
    }

    /// Writes the store to its configured location.
    pub fn flush(&mut self) -> Result<()> {
        let location = self
            .config
            .location
            .as_deref()
            .ok_or(PersistenceError::NotBound)?;
        persistence::flush(self, location)?;
        self.dirty = false;
        Ok(())
    }

    /// Writes the store to `location` without changing its binding.
    pub fn flush_to(&self, location: impl AsRef<Path>) -> Result<()> {
        persistence::flush(self, location.as_ref())?;
        Ok(())
    }

    /// Marks the store dirty and flushes under the immediate policy. On
    /// failure the dirty flag is put back, since the caller rolls the
    /// mutation back.
    fn commit(&mut self) -> Result<()> {
        let was_dirty = self.dirty;
        self.dirty = true;
        let flushed = match self.config.flush_policy {
            FlushPolicy::Immediate if self.config.location.is_some() => self.flush(),
            _ => Ok(()),
        };
        if flushed.is_err() {
            self.dirty = was_dirty;
        }
        flushed
    }

    fn restore(&mut self, entry: Entry) {
        let id = entry.id.clone();
        if let Err(e) = self.tree.insert(entry) {
            warn!(id = %id, error = %e, "could not restore entry");
        }
    }
}

//! The spatial index module
//! A KD-tree over fixed-dimension entries with batch build, incremental
//! insert, ID-based removal and pruned k-nearest-neighbor search.
//!
//! Split decisions are made once, when a node is created, and never
//! revisited. Removal clears the slot that held the leaf and leaves its
//! parent in place, so a mutated tree may contain internal nodes with one
//! or two empty children. Every traversal treats an empty slot as holding
//! nothing.

use crate::error::{Result, StoreError};
use crate::vector::{check_dimension, euclidean_distance};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::trace;

/// A stored point: stable ID, coordinates and an optional text payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub values: Vec<f32>,
    pub text: Option<String>,
}

impl Entry {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Entry {
        Entry { id: id.into(), values, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Entry {
        self.text = Some(text.into());
        self
    }
}

/// One search hit, ranked by `distance` (Euclidean) to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub entry: Entry,
    pub distance: f32,
}

/// A tree slot. `None` is an empty subtree.
type Link = Option<Box<Node>>;

#[derive(Debug)]
pub enum Node {
    Leaf {
        entry: Entry,
    },
    Internal {
        left: Link,
        right: Link,
        split_dimension: usize,
        split_value: f32,
    },
}

#[derive(Debug, Default)]
pub struct KdTree {
    root: Link,
    dimension: Option<usize>,
    len: usize,
}

impl KdTree {
    /// Creates an empty tree. The dimension is fixed by the first insert.
    pub fn new() -> KdTree {
        KdTree::default()
    }

    /// Builds a balanced tree from a batch of entries.
    ///
    /// At each level the points are sorted on axis `depth % D` and split at
    /// the median index; the median itself goes right and its coordinate
    /// becomes the split value. An empty batch yields an empty tree.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` (or `EmptyVector`) if the entries do not
    /// all share one non-zero dimension, and `NonFiniteValue` if any
    /// coordinate is NaN or infinite.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::{Entry, KdTree};
    ///
    /// let tree = KdTree::build(vec![
    ///     Entry::new("a", vec![1.0, 2.0]),
    ///     Entry::new("b", vec![3.0, 4.0]),
    ///     Entry::new("c", vec![5.0, 6.0]),
    /// ]).unwrap();
    /// assert_eq!(tree.len(), 3);
    /// assert_eq!(tree.depth(), 3);
    /// ```
    pub fn build(entries: Vec<Entry>) -> Result<KdTree> {
        let Some(first) = entries.first() else {
            return Ok(KdTree::new());
        };

        let dimension = check_dimension(&first.values, None)?;
        for entry in &entries {
            check_dimension(&entry.values, Some(dimension))?;
        }

        let len = entries.len();
        Ok(KdTree {
            root: Some(Box::new(build_node(entries, 0, dimension))),
            dimension: Some(dimension),
            len,
        })
    }

    /// Builds a balanced tree and keeps `dimension` even when `entries` is
    /// empty.
    pub fn build_with_dimension(entries: Vec<Entry>, dimension: Option<usize>) -> Result<KdTree> {
        let mut tree = KdTree::build(entries)?;
        match (tree.dimension, dimension) {
            (None, _) => tree.dimension = dimension,
            (Some(actual), Some(expected)) if actual != expected => {
                return Err(StoreError::DimensionMismatch { expected, actual });
            }
            _ => {}
        }
        Ok(tree)
    }

    /// Inserts one entry without rebalancing.
    ///
    /// The entry descends by `values[split_dimension] < split_value`
    /// (left) until it reaches an empty slot, which takes a new leaf, or a
    /// leaf, which becomes an internal node holding both points. The new
    /// internal node splits on `depth % D` at the new point's coordinate.
    pub fn insert(&mut self, entry: Entry) -> Result<()> {
        let dimension = check_dimension(&entry.values, self.dimension)?;
        self.dimension = Some(dimension);
        insert_into(&mut self.root, entry, 0);
        self.len += 1;
        Ok(())
    }

    /// Removes the first entry with `id` and returns it.
    ///
    /// IDs carry no spatial meaning, so this is a full depth-first walk.
    /// The emptied slot is left in its parent; nothing is collapsed.
    pub fn remove(&mut self, id: &str) -> Option<Entry> {
        let removed = remove_from(&mut self.root, id);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Returns the first entry with `id`.
    pub fn get(&self, id: &str) -> Option<&Entry> {
        find(&self.root, id)
    }

    /// Every stored entry, in traversal order (left before right).
    pub fn entries(&self) -> Vec<&Entry> {
        let mut out = Vec::with_capacity(self.len);
        collect(&self.root, &mut out);
        out
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The established dimension, if any entry was ever stored.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Drops the established dimension of an empty tree.
    pub(crate) fn forget_dimension(&mut self) {
        if self.is_empty() {
            self.dimension = None;
        }
    }

    /// Height of the tree counted in nodes; 0 for an empty root.
    pub fn depth(&self) -> usize {
        depth(&self.root)
    }

    /// Number of nodes (leaves plus internal nodes).
    pub fn node_count(&self) -> usize {
        node_count(&self.root)
    }

    /// Returns up to `k` entries closest to `query`, ascending by distance.
    ///
    /// The near side of each split is searched first. The far side is only
    /// visited while fewer than `k` candidates are held, or while the
    /// distance from the query to the split plane is smaller than the
    /// current k-th best distance. Equal distances keep the order in which
    /// they were reached.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::{Entry, KdTree};
    ///
    /// let mut tree = KdTree::new();
    /// tree.insert(Entry::new("a", vec![1.0, 2.0, 3.0])).unwrap();
    /// tree.insert(Entry::new("b", vec![4.0, 5.0, 6.0])).unwrap();
    ///
    /// let hits = tree.k_nearest(&[1.0, 2.0, 3.0], 1).unwrap();
    /// assert_eq!(hits[0].entry.id, "a");
    /// assert_eq!(hits[0].distance, 0.0);
    /// ```
    pub fn k_nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let (hits, visited) = self.k_nearest_with_stats(query, k)?;
        trace!(k, visited, total = self.len, "tree search");
        Ok(hits)
    }

    /// [`KdTree::k_nearest`] plus the number of leaves whose distance was
    /// computed.
    pub(crate) fn k_nearest_with_stats(&self, query: &[f32], k: usize) -> Result<(Vec<Neighbor>, usize)> {
        check_dimension(query, self.dimension)?;

        let k = k.min(self.len);
        if k == 0 {
            return Ok((Vec::new(), 0));
        }

        let mut best = Candidates::new(k);
        nearest(&self.root, query, &mut best);
        let visited = best.visited;
        Ok((best.into_neighbors(), visited))
    }

    /// Indented dump of the tree, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render(&self.root, 0, &mut out);
        out
    }
}

fn build_node(mut points: Vec<Entry>, depth: usize, dimension: usize) -> Node {
    if points.len() == 1 {
        return Node::Leaf { entry: points.remove(0) };
    }

    let split_dimension = depth % dimension;
    points.sort_by(|a, b| a.values[split_dimension].total_cmp(&b.values[split_dimension]));

    let median = points.len() / 2;
    let split_value = points[median].values[split_dimension];
    let right = points.split_off(median);

    Node::Internal {
        left: Some(Box::new(build_node(points, depth + 1, dimension))),
        right: Some(Box::new(build_node(right, depth + 1, dimension))),
        split_dimension,
        split_value,
    }
}

fn insert_into(slot: &mut Link, entry: Entry, depth: usize) {
    match slot.as_deref_mut() {
        None => {
            *slot = Some(Box::new(Node::Leaf { entry }));
        }
        Some(Node::Internal { left, right, split_dimension, split_value }) => {
            let next = if entry.values[*split_dimension] < *split_value {
                left
            } else {
                right
            };
            insert_into(next, entry, depth + 1);
        }
        Some(Node::Leaf { entry: existing }) => {
            let split_dimension = depth % entry.values.len();
            let split_value = entry.values[split_dimension];
            // Keep left <= split_value <= right so search pruning stays exact.
            let existing_goes_left = existing.values[split_dimension] <= split_value;

            let existing = slot.take();
            let new_leaf = Some(Box::new(Node::Leaf { entry }));
            let (left, right) = if existing_goes_left {
                (existing, new_leaf)
            } else {
                (new_leaf, existing)
            };

            *slot = Some(Box::new(Node::Internal { left, right, split_dimension, split_value }));
        }
    }
}

fn remove_from(slot: &mut Link, id: &str) -> Option<Entry> {
    match slot.as_deref_mut()? {
        Node::Internal { left, right, .. } => {
            remove_from(left, id).or_else(|| remove_from(right, id))
        }
        Node::Leaf { entry } if entry.id != id => None,
        Node::Leaf { .. } => {
            let Some(Node::Leaf { entry }) = slot.take().map(|node| *node) else {
                unreachable!("slot was matched as a leaf");
            };
            Some(entry)
        }
    }
}

fn find<'a>(link: &'a Link, id: &str) -> Option<&'a Entry> {
    match link.as_deref()? {
        Node::Leaf { entry } => (entry.id == id).then_some(entry),
        Node::Internal { left, right, .. } => find(left, id).or_else(|| find(right, id)),
    }
}

fn collect<'a>(link: &'a Link, out: &mut Vec<&'a Entry>) {
    match link.as_deref() {
        None => {}
        Some(Node::Leaf { entry }) => out.push(entry),
        Some(Node::Internal { left, right, .. }) => {
            collect(left, out);
            collect(right, out);
        }
    }
}

fn depth(link: &Link) -> usize {
    match link.as_deref() {
        None => 0,
        Some(Node::Leaf { .. }) => 1,
        Some(Node::Internal { left, right, .. }) => 1 + depth(left).max(depth(right)),
    }
}

fn node_count(link: &Link) -> usize {
    match link.as_deref() {
        None => 0,
        Some(Node::Leaf { .. }) => 1,
        Some(Node::Internal { left, right, .. }) => 1 + node_count(left) + node_count(right),
    }
}

fn render(link: &Link, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match link.as_deref() {
        None => {}
        Some(Node::Leaf { entry }) => {
            let _ = writeln!(out, "{}ID: {}, Point: {:?}", indent, entry.id, entry.values);
        }
        Some(Node::Internal { left, right, split_dimension, split_value }) => {
            let _ = writeln!(
                out,
                "{}Split Dimension: {}, Split Value: {:.2}",
                indent, split_dimension, split_value
            );
            render(left, depth + 1, out);
            render(right, depth + 1, out);
        }
    }
}

/// Bounded ascending candidate list holding at most `k` hits.
struct Candidates<'a> {
    k: usize,
    items: Vec<(&'a Entry, f32)>,
    visited: usize,
}

impl<'a> Candidates<'a> {
    fn new(k: usize) -> Candidates<'a> {
        Candidates { k, items: Vec::with_capacity(k + 1), visited: 0 }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.k
    }

    /// Distance of the k-th best; unbounded until the list is full.
    fn worst(&self) -> f32 {
        if !self.is_full() {
            return f32::INFINITY;
        }
        self.items.last().map_or(f32::INFINITY, |&(_, d)| d)
    }

    fn push(&mut self, entry: &'a Entry, distance: f32) {
        self.visited += 1;
        if self.is_full() && distance >= self.worst() {
            return;
        }
        let at = self.items.partition_point(|&(_, d)| d <= distance);
        self.items.insert(at, (entry, distance));
        self.items.truncate(self.k);
    }

    fn into_neighbors(self) -> Vec<Neighbor> {
        self.items
            .into_iter()
            .map(|(entry, distance)| Neighbor { entry: entry.clone(), distance })
            .collect()
    }
}

fn nearest<'a>(link: &'a Link, query: &[f32], best: &mut Candidates<'a>) {
    match link.as_deref() {
        None => {}
        Some(Node::Leaf { entry }) => {
            best.push(entry, euclidean_distance(query, &entry.values));
        }
        Some(Node::Internal { left, right, split_dimension, split_value }) => {
            let coordinate = query[*split_dimension];
            let (near, far) = if coordinate < *split_value {
                (left, right)
            } else {
                (right, left)
            };

            nearest(near, query, best);
            if !best.is_full() || (coordinate - *split_value).abs() < best.worst() {
                nearest(far, query, best);
            }
        }
    }
}

//! The balanced spatial tree.
//!
//! A Guttman-style R-tree over 4D point entries. Insertion descends by
//! minimum penalty and splits overflowing nodes with the quadratic
//! seed-and-grow heuristic; removal condenses underfull nodes and
//! re-inserts their entries, so the tree stays height-balanced (all leaves
//! at the same depth by construction: splits only ever add height at the
//! root).
//!
//! # Concurrency
//!
//! The tree is wrapped in a coarse `parking_lot::RwLock`: writers take the
//! lock for the duration of one insert/remove, readers share it for
//! queries. Queries running concurrently with inserts observe newly
//! inserted entries with eventual visibility; no linearizable read
//! guarantee is made or needed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::TreeConfig;
use crate::entry::GeoEntry;
use crate::error::{IndexError, IndexResult};
use crate::node::{quadratic_split, Node};
use crate::region::{Region, DIMS};

/// Distance metric for nearest-neighbor queries.
///
/// Geodesic ordering is computed from the Euclidean chord through the
/// monotone map `d = 2·asin(chord/2)`, so both metrics share the same
/// admissible Euclidean lower bound during traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMetric {
    /// Straight-line distance in R⁴.
    #[default]
    Euclidean,
    /// Angular distance on S³; callers must supply unit-norm query points.
    Geodesic,
}

impl QueryMetric {
    /// Convert a chord length into the metric's reported distance.
    #[inline]
    fn from_chord(&self, chord: f64) -> f64 {
        match self {
            QueryMetric::Euclidean => chord,
            QueryMetric::Geodesic => 2.0 * (chord / 2.0).clamp(-1.0, 1.0).asin(),
        }
    }
}

struct Core<I> {
    root: Option<Node<I>>,
    len: usize,
    config: TreeConfig,
}

/// Height-balanced spatial access method over `(id, point, key)` entries.
///
/// # Example
///
/// ```
/// use sphere_graph_index::{GeoEntry, QueryMetric, Region, SpatialTree, TreeConfig};
///
/// let tree: SpatialTree<u32> = SpatialTree::new(TreeConfig::default());
/// for i in 0..100u32 {
///     let x = f64::from(i) / 100.0;
///     tree.insert(GeoEntry::new(i, [x, 0.0, 0.0, 0.0], 0)).unwrap();
/// }
///
/// let near = tree.nearest_k(&[0.5, 0.0, 0.0, 0.0], 3, QueryMetric::Euclidean);
/// assert_eq!(near.len(), 3);
/// assert_eq!(near[0].0, 50);
/// ```
pub struct SpatialTree<I> {
    inner: RwLock<Core<I>>,
}

impl<I> SpatialTree<I>
where
    I: Clone + Eq,
{
    /// Create an empty tree. Panics only on an invalid configuration;
    /// use [`SpatialTree::try_new`] to surface that as an error.
    pub fn new(config: TreeConfig) -> Self {
        Self::try_new(config).expect("invalid tree configuration")
    }

    /// Create an empty tree, validating the configuration.
    pub fn try_new(config: TreeConfig) -> IndexResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: RwLock::new(Core {
                root: None,
                len: 0,
                config,
            }),
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tree height; 0 when empty, 1 for a single leaf.
    pub fn height(&self) -> usize {
        self.inner.read().root.as_ref().map_or(0, |r| r.height())
    }

    /// Minimal region covering every entry, or `None` when empty.
    pub fn bounds(&self) -> Option<Region> {
        self.inner.read().root.as_ref().map(|r| *r.region())
    }

    /// Insert an entry.
    ///
    /// Descends along the child with the minimum enlargement penalty,
    /// splits on overflow, and propagates bounding-region updates upward.
    ///
    /// # Errors
    ///
    /// `IndexError::NonFiniteCoordinate` for NaN/infinite positions;
    /// nothing is inserted in that case.
    pub fn insert(&self, entry: GeoEntry<I>) -> IndexResult<()> {
        entry.validate()?;
        let mut core = self.inner.write();
        Self::insert_into(&mut core, entry);
        core.len += 1;
        Ok(())
    }

    fn insert_into(core: &mut Core<I>, entry: GeoEntry<I>) {
        let config = core.config;
        match core.root.take() {
            None => {
                core.root = Some(Node::leaf(vec![entry]));
            }
            Some(mut root) => {
                if let Some(sibling) = Self::insert_rec(&mut root, entry, &config) {
                    debug!(height = root.height() + 1, "spatial tree root split");
                    root = Node::internal(vec![root, sibling]);
                }
                core.root = Some(root);
            }
        }
    }

    /// Recursive insert; returns a new sibling when `node` split.
    fn insert_rec(node: &mut Node<I>, entry: GeoEntry<I>, config: &TreeConfig) -> Option<Node<I>> {
        match node {
            Node::Leaf { entries, .. } => {
                entries.push(entry);
                if entries.len() > config.max_entries {
                    let all = std::mem::take(entries);
                    let (keep, give) = quadratic_split(all, config);
                    *entries = keep;
                    node.refresh_region();
                    Some(Node::leaf(give))
                } else {
                    node.refresh_region();
                    None
                }
            }
            Node::Internal { children, .. } => {
                let target = Self::choose_subtree(children, &entry.region());
                let split = Self::insert_rec(&mut children[target], entry, config);
                if let Some(sibling) = split {
                    children.push(sibling);
                    if children.len() > config.max_entries {
                        let all = std::mem::take(children);
                        let (keep, give) = quadratic_split(all, config);
                        *children = keep;
                        node.refresh_region();
                        return Some(Node::internal(give));
                    }
                }
                node.refresh_region();
                None
            }
        }
    }

    /// Pick the child whose region grows least to cover `candidate`.
    ///
    /// Tie chain: volume penalty, then margin penalty (flat regions all
    /// have zero volume growth), then current volume, then Euclidean
    /// center distance - the degenerate-region fallback.
    fn choose_subtree(children: &[Node<I>], candidate: &Region) -> usize {
        let target = candidate.center();
        let mut best = 0;
        let mut best_key = Self::descent_key(children[0].region(), candidate, &target);
        for (idx, child) in children.iter().enumerate().skip(1) {
            let key = Self::descent_key(child.region(), candidate, &target);
            if key_less(&key, &best_key) {
                best = idx;
                best_key = key;
            }
        }
        best
    }

    fn descent_key(region: &Region, candidate: &Region, target: &[f64; DIMS]) -> [f64; 4] {
        let center = region.center();
        let center_dist_sq: f64 = center
            .iter()
            .zip(target.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        [
            region.penalty(candidate),
            region.margin_penalty(candidate),
            region.volume(),
            center_dist_sq,
        ]
    }

    /// Remove the entry with `id` stored at `point`.
    ///
    /// Underfull nodes along the path are condensed: their remaining
    /// entries are re-inserted so occupancy invariants hold everywhere.
    ///
    /// # Errors
    ///
    /// `IndexError::EntryNotFound` when no leaf reachable under `point`
    /// holds `id`.
    pub fn remove(&self, id: &I, point: &[f64; DIMS]) -> IndexResult<()> {
        let mut core = self.inner.write();
        let config = core.config;

        let Some(mut root) = core.root.take() else {
            return Err(IndexError::EntryNotFound);
        };

        let mut orphans = Vec::new();
        let found = Self::remove_rec(&mut root, id, point, &config, &mut orphans);
        if !found {
            core.root = Some(root);
            return Err(IndexError::EntryNotFound);
        }

        core.root = Self::collapse_root(root);
        core.len -= 1;
        for orphan in orphans {
            Self::insert_into(&mut core, orphan);
        }
        Ok(())
    }

    /// Shrink a root that lost its purpose: drop an empty leaf, pull up a
    /// single-child chain.
    fn collapse_root(mut root: Node<I>) -> Option<Node<I>> {
        loop {
            match root {
                Node::Leaf { entries, region } => {
                    if entries.is_empty() {
                        return None;
                    }
                    return Some(Node::Leaf { entries, region });
                }
                Node::Internal { mut children, region } => match children.len() {
                    0 => return None,
                    1 => {
                        root = children.pop()?;
                    }
                    _ => return Some(Node::Internal { children, region }),
                },
            }
        }
    }

    fn remove_rec(
        node: &mut Node<I>,
        id: &I,
        point: &[f64; DIMS],
        config: &TreeConfig,
        orphans: &mut Vec<GeoEntry<I>>,
    ) -> bool {
        match node {
            Node::Leaf { entries, .. } => {
                if let Some(pos) = entries.iter().position(|e| e.id == *id) {
                    entries.remove(pos);
                    node.refresh_region();
                    true
                } else {
                    false
                }
            }
            Node::Internal { children, .. } => {
                let mut found_at = None;
                for (idx, child) in children.iter_mut().enumerate() {
                    if !child.region().contains_point(point) {
                        continue;
                    }
                    if Self::remove_rec(child, id, point, config, orphans) {
                        found_at = Some(idx);
                        break;
                    }
                }
                let Some(idx) = found_at else {
                    return false;
                };
                if children[idx].occupancy() < config.min_entries {
                    let underfull = children.remove(idx);
                    underfull.drain_entries(orphans);
                }
                node.refresh_region();
                true
            }
        }
    }

    /// All entry ids whose points lie inside `query`.
    ///
    /// Traversal prunes subtrees whose region is not `consistent` with the
    /// query; leaf points are then filtered exactly, so the result carries
    /// no false positives.
    pub fn range(&self, query: &Region) -> Vec<I> {
        let core = self.inner.read();
        let mut out = Vec::new();
        if let Some(root) = core.root.as_ref() {
            Self::range_rec(root, query, &mut out);
        }
        out
    }

    fn range_rec(node: &Node<I>, query: &Region, out: &mut Vec<I>) {
        if !node.region().consistent(query) {
            return;
        }
        match node {
            Node::Leaf { entries, .. } => {
                for entry in entries {
                    if query.contains_point(&entry.point) {
                        out.push(entry.id.clone());
                    }
                }
            }
            Node::Internal { children, .. } => {
                for child in children {
                    Self::range_rec(child, query, out);
                }
            }
        }
    }

    /// The `k` entries closest to `point`, ordered by ascending distance.
    ///
    /// Best-first traversal: a min-heap ordered by an admissible lower
    /// bound (Euclidean distance to the node region) guarantees entries are
    /// surfaced in true distance order for both metrics.
    pub fn nearest_k(&self, point: &[f64; DIMS], k: usize, metric: QueryMetric) -> Vec<(I, f64)> {
        let core = self.inner.read();
        let mut out = Vec::with_capacity(k);
        let Some(root) = core.root.as_ref() else {
            return out;
        };
        if k == 0 {
            return out;
        }

        let mut heap: BinaryHeap<Candidate<'_, I>> = BinaryHeap::new();
        heap.push(Candidate {
            dist: metric.from_chord(root.region().min_distance(point)),
            kind: CandidateKind::Node(root),
        });

        while let Some(candidate) = heap.pop() {
            match candidate.kind {
                CandidateKind::Entry(entry) => {
                    out.push((entry.id.clone(), candidate.dist));
                    if out.len() == k {
                        break;
                    }
                }
                CandidateKind::Node(Node::Leaf { entries, .. }) => {
                    for entry in entries {
                        let chord: f64 = entry
                            .point
                            .iter()
                            .zip(point.iter())
                            .map(|(a, b)| (a - b) * (a - b))
                            .sum::<f64>()
                            .sqrt();
                        heap.push(Candidate {
                            dist: metric.from_chord(chord),
                            kind: CandidateKind::Entry(entry),
                        });
                    }
                }
                CandidateKind::Node(Node::Internal { children, .. }) => {
                    for child in children {
                        heap.push(Candidate {
                            dist: metric.from_chord(child.region().min_distance(point)),
                            kind: CandidateKind::Node(child),
                        });
                    }
                }
            }
        }
        out
    }
}

enum CandidateKind<'a, I> {
    Node(&'a Node<I>),
    Entry(&'a GeoEntry<I>),
}

/// Heap item ordered so the smallest distance pops first.
struct Candidate<'a, I> {
    dist: f64,
    kind: CandidateKind<'a, I>,
}

impl<I> PartialEq for Candidate<'_, I> {
    fn eq(&self, other: &Self) -> bool {
        self.dist.total_cmp(&other.dist).is_eq()
    }
}

impl<I> Eq for Candidate<'_, I> {}

impl<I> PartialOrd for Candidate<'_, I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I> Ord for Candidate<'_, I> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we need the nearest first.
        other.dist.total_cmp(&self.dist)
    }
}

fn key_less(a: &[f64; 4], b: &[f64; 4]) -> bool {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.total_cmp(y) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
    }
    false
}

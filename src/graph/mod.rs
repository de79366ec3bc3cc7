//! Streaming Vamana graph index.
//!
//! A flat navigable graph in the DiskANN family: every node keeps at
//! most `R` out-edges chosen by alpha-pruning, searches walk the graph
//! greedily from a maintained entry point, and updates are applied in
//! place: inserts splice a node in via search-and-prune, deletes
//! patch the surrounding neighborhood instead of rebuilding.
//!
//! # Update model
//!
//! | Operation | Cost | Mechanism |
//! |-----------|------|-----------|
//! | insert    | one beam search + prune | splice + reverse-edge patch |
//! | update    | insert minus node creation | re-link in place |
//! | remove    | one local search + O(degree) patches | in-place deletion |
//! | batch_delete | O(total edges) sweep | tombstone scrub |
//!
//! Deletion follows the in-place protocol: a local search collects the
//! doomed node's neighborhood, approximate in-neighbors get replacement
//! edges into that neighborhood, transit paths through the node are
//! re-routed, and only then is the node tombstoned and erased. This
//! keeps recall stable under churn without a global rebuild.
//!
//! # Concurrency
//!
//! Single-writer, many-reader, serialized by the enclosing system.
//! Searches are pure reads over the node store plus thread-local
//! scratch; the entry point is a relaxed atomic (any live id is a
//! valid entry point, stale reads just cost a few hops); the medoid
//! tracker's mutex is the only internal lock.
//!
//! # References
//!
//! - Subramanya et al. (2019): "DiskANN: Fast Accurate Billion-point
//!   Nearest Neighbor Search on a Single Node"
//! - Singh et al. (2021): "FreshDiskANN: A Fast and Accurate
//!   Graph-Based ANN Index for Streaming Similarity Search"
//! - Xu et al. (2025): "IP-DiskANN: In-Place Graph Index Updates for
//!   Streaming ANN"

mod search;

pub use search::{Candidate, SearchFilter, SearchResult};

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::distance::{self, Metric};
use crate::error::{IndexError, Result};
use crate::medoid::MedoidTracker;

/// Beam width of the local search that seeds a deletion.
const DELETE_BEAM: usize = 128;
/// Size of the local neighborhood retained around a deleted node.
const DELETE_KEEP: usize = 50;
/// Edges copied per anchor when patching around a deleted node.
const DELETE_FANOUT: usize = 3;
/// Relaxation used when a patched neighbor list must be re-pruned.
const PATCH_ALPHA: f32 = 1.2;
/// Beam width of the cheap entry-point refresh search.
const REFRESH_BEAM: usize = 64;

/// Distance sentinel marking a candidate already consumed by
/// [`Vamana::robust_prune`].
const PRUNED: f32 = f32::MIN;

/// Build-time parameters of the graph.
///
/// Beam width `L` and pruning relaxation `alpha` are per-operation
/// arguments, not construction state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VamanaConfig {
    /// Vector dimensionality, fixed for the lifetime of the graph.
    pub dims: usize,
    /// Maximum out-degree per node (R).
    pub max_degree: usize,
    /// Distance metric.
    pub metric: Metric,
    /// Inserts/deletes between entry-point refreshes; 0 selects the
    /// default of 10 000.
    pub medoid_interval: u64,
}

impl Default for VamanaConfig {
    fn default() -> Self {
        Self {
            dims: 768,
            max_degree: 64,
            metric: Metric::L2,
            medoid_interval: 0,
        }
    }
}

/// A stored vector and its bounded out-edge list.
///
/// The inline capacity matches typical degree bounds so neighbor lists
/// avoid a heap allocation at R ≤ 32.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub vector: Vec<f32>,
    pub neighbors: SmallVec<[u32; 32]>,
}

impl Node {
    fn with_vector(vector: Vec<f32>) -> Self {
        Self {
            vector,
            neighbors: SmallVec::new(),
        }
    }
}

/// Point-in-time counters for the index.
#[derive(Debug, Clone, Copy)]
pub struct GraphStats {
    /// Live nodes currently in the store.
    pub num_nodes: usize,
    /// Ids awaiting a [`Vamana::batch_delete`] sweep.
    pub num_tombstoned: usize,
    pub dims: usize,
    pub max_degree: usize,
}

/// Streaming Vamana index over caller-assigned `u32` ids.
///
/// Mutators are total: operations on missing or tombstoned ids are
/// absorbed as no-ops. Writers must be serialized externally; searches
/// may run concurrently with each other (see the module docs).
pub struct Vamana {
    max_degree: usize,
    metric: Metric,
    dims: usize,
    nodes: HashMap<u32, Node>,
    /// Logically removed ids, consulted by search until the next
    /// sweep scrubs them out of neighbor lists.
    tombstones: HashSet<u32>,
    /// Entry point; eventually consistent, always a live id while the
    /// store is non-empty.
    start: AtomicU32,
    medoid: MedoidTracker,
}

impl Vamana {
    /// Create an empty graph.
    pub fn new(config: VamanaConfig) -> Result<Self> {
        if config.dims == 0 {
            return Err(IndexError::InvalidParameter(
                "dims must be non-zero".into(),
            ));
        }
        if config.max_degree == 0 {
            return Err(IndexError::InvalidParameter(
                "max_degree must be non-zero".into(),
            ));
        }
        Ok(Self {
            max_degree: config.max_degree,
            metric: config.metric,
            dims: config.dims,
            nodes: HashMap::new(),
            tombstones: HashSet::new(),
            start: AtomicU32::new(0),
            medoid: MedoidTracker::new(config.dims, config.medoid_interval),
        })
    }

    /// Insert `vector` under `id` and splice it into the graph.
    ///
    /// Re-inserting a live id overwrites its vector (the medoid
    /// tracker sees the old vector leave and the new one arrive, so
    /// its count stays equal to the live node count).
    pub fn insert(&mut self, id: u32, vector: Vec<f32>, l: usize, alpha: f32) {
        debug_assert_eq!(vector.len(), self.dims);

        match self.nodes.entry(id) {
            Entry::Occupied(mut e) => {
                self.medoid.sub(&e.get().vector);
                e.get_mut().vector = vector.clone();
            }
            Entry::Vacant(e) => {
                e.insert(Node::with_vector(vector.clone()));
            }
        }
        if self.nodes.len() == 1 {
            // First node: it is the only possible entry point; every
            // later refresh goes through the centroid search.
            self.start.store(id, Ordering::Relaxed);
        }

        self.try_medoid_compute(&vector, false);
        self.link(id, &vector, l, alpha);
    }

    /// Overwrite the vector of a live id and re-link it.
    ///
    /// No-op when the id is missing or tombstoned.
    pub fn update(&mut self, id: u32, vector: Vec<f32>, l: usize, alpha: f32) {
        debug_assert_eq!(vector.len(), self.dims);
        if self.tombstones.contains(&id) {
            return;
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.vector = vector.clone();
        self.link(id, &vector, l, alpha);
    }

    /// Search-and-prune splice shared by insert and update: find the
    /// node's neighborhood, select its out-edges, then patch reverse
    /// edges into the affected neighbors.
    fn link(&mut self, id: u32, vector: &[f32], l: usize, alpha: f32) {
        let mut local = SearchResult::default();
        self.greedy_search(self.start_node(), vector, l, l, &mut local, None);
        self.robust_prune(id, &mut local.nearest, alpha);
        self.update_neighbors(id, vector, alpha);
    }

    /// Select out-neighbors for `p` from `candidates` under the
    /// two-pass alpha-RNG rule.
    ///
    /// `candidates` must be sorted closest-first to `p`. The first
    /// pass applies the strict relative-neighborhood rule (alpha = 1);
    /// the second relaxes to `max_alpha` and backfills up to the
    /// degree bound from candidates the strict pass rejected. A
    /// candidate `q` is dominated when some already-selected neighbor
    /// `a` satisfies `alpha * d(a, q) <= d(p, q)`. Self-loops and
    /// missing ids are skipped; admitted entries are consumed via a
    /// distance sentinel so a later pass cannot re-admit them.
    fn robust_prune(&mut self, p: u32, candidates: &mut [Candidate], max_alpha: f32) {
        if !self.nodes.contains_key(&p) {
            return;
        }

        let mut selected: SmallVec<[u32; 32]> = SmallVec::new();
        'passes: for alpha in [1.0, max_alpha] {
            for i in 0..candidates.len() {
                if selected.len() >= self.max_degree {
                    break 'passes;
                }
                let Candidate { id: q, distance: d_pq } = candidates[i];
                if d_pq == PRUNED || q == p || selected.contains(&q) {
                    continue;
                }
                let Some(q_node) = self.nodes.get(&q) else {
                    continue;
                };

                let mut dominated = false;
                for &a in &selected {
                    let Some(a_node) = self.nodes.get(&a) else {
                        continue;
                    };
                    let d_aq = distance::compute(self.metric, &a_node.vector, &q_node.vector);
                    if alpha * d_aq <= d_pq {
                        dominated = true;
                        break;
                    }
                }
                if dominated {
                    continue;
                }

                selected.push(q);
                candidates[i].distance = PRUNED;
            }
        }

        if let Some(node) = self.nodes.get_mut(&p) {
            node.neighbors = selected;
        }
    }

    /// Offer `id` as a reverse edge to each of its new neighbors:
    /// append while there is room, otherwise rebuild the neighbor's
    /// list through a prune over its current edges plus `id`.
    fn update_neighbors(&mut self, id: u32, vector: &[f32], alpha: f32) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let neighbors: SmallVec<[u32; 32]> = node.neighbors.clone();

        for nb in neighbors {
            if self.tombstones.contains(&nb) {
                continue;
            }
            let Some(nb_node) = self.nodes.get(&nb) else {
                continue;
            };

            if nb_node.neighbors.len() >= self.max_degree {
                let mut candidates: Vec<Candidate> =
                    Vec::with_capacity(nb_node.neighbors.len() + 1);
                for &nn in &nb_node.neighbors {
                    if self.tombstones.contains(&nn) {
                        continue;
                    }
                    let Some(nn_node) = self.nodes.get(&nn) else {
                        continue;
                    };
                    candidates.push(Candidate::new(
                        nn,
                        distance::compute(self.metric, &nn_node.vector, &nb_node.vector),
                    ));
                }
                candidates.push(Candidate::new(
                    id,
                    distance::compute(self.metric, &nb_node.vector, vector),
                ));
                candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                self.robust_prune(nb, &mut candidates, alpha);
            } else if !nb_node.neighbors.contains(&id) {
                if let Some(n) = self.nodes.get_mut(&nb) {
                    n.neighbors.push(id);
                }
            }
        }
    }

    /// Delete `id` in place, patching the surrounding neighborhood so
    /// connectivity survives without a rebuild.
    ///
    /// The id is tombstoned (hiding it from in-flight searches) and
    /// physically erased in the same call; [`batch_delete`] later
    /// scrubs dangling references out of neighbor lists.
    ///
    /// [`batch_delete`]: Vamana::batch_delete
    pub fn remove(&mut self, id: u32) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let vector = node.vector.clone();
        let out_neighbors: SmallVec<[u32; 32]> = node.neighbors.clone();

        // Local neighborhood around the doomed node.
        let mut local = SearchResult::default();
        self.greedy_search(
            self.start_node(),
            &vector,
            DELETE_KEEP,
            DELETE_BEAM,
            &mut local,
            None,
        );

        // Approximate in-neighbors: local nodes whose edge list points
        // at the doomed id.
        let approx_in: Vec<u32> = local
            .nearest
            .iter()
            .filter(|c| {
                self.nodes
                    .get(&c.id)
                    .is_some_and(|n| n.neighbors.contains(&id))
            })
            .map(|c| c.id)
            .collect();

        // Isolated node: nothing to patch.
        if approx_in.is_empty() && out_neighbors.is_empty() {
            self.medoid.sub(&vector);
            self.tombstones.insert(id);
            self.nodes.remove(&id);
            if self.start_node() == id {
                if let Some(&next) = self.nodes.keys().next() {
                    self.start.store(next, Ordering::Relaxed);
                }
            }
            return;
        }

        // Replace each in-neighbor's lost edge with edges into the
        // local neighborhood.
        for &z in &approx_in {
            if !self.nodes.contains_key(&z) {
                continue;
            }
            let adds = self.select_top_c(z, id, &local);
            self.patch_edges(z, &adds);
        }

        // Preserve transit paths that used to pass through the doomed
        // node: route its former out-neighbors from nearby anchors.
        for &w in &out_neighbors {
            if !self.nodes.contains_key(&w) {
                continue;
            }
            let anchors = self.select_top_c(w, id, &local);
            for y in anchors {
                if y == w || !self.nodes.contains_key(&y) {
                    continue;
                }
                self.patch_edges(y, &[w]);
            }
        }

        self.medoid.sub(&vector);
        self.tombstones.insert(id);
        self.nodes.remove(&id);

        if self.start_node() == id {
            if let Some(&seed) = self.nodes.keys().next() {
                let centroid = self.medoid.centroid();
                let mut res = SearchResult::default();
                self.greedy_search(seed, &centroid, 1, REFRESH_BEAM, &mut res, None);
                let new_start = res.nearest.first().map_or(seed, |c| c.id);
                debug!(start = new_start, "reseated entry point after delete");
                self.start.store(new_start, Ordering::Relaxed);
            }
        }
    }

    /// Up to [`DELETE_FANOUT`] ids from the local neighborhood closest
    /// to `anchor`, excluding the doomed id and anything already gone.
    fn select_top_c(
        &self,
        anchor: u32,
        doomed: u32,
        local: &SearchResult,
    ) -> SmallVec<[u32; DELETE_FANOUT]> {
        let Some(anchor_node) = self.nodes.get(&anchor) else {
            return SmallVec::new();
        };

        let mut scored: Vec<(f32, u32)> = Vec::with_capacity(local.nearest.len());
        for cand in &local.nearest {
            if cand.id == doomed {
                continue;
            }
            let Some(cand_node) = self.nodes.get(&cand.id) else {
                continue;
            };
            scored.push((
                distance::compute(self.metric, &anchor_node.vector, &cand_node.vector),
                cand.id,
            ));
        }
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored
            .into_iter()
            .take(DELETE_FANOUT)
            .map(|(_, cid)| cid)
            .collect()
    }

    /// Append `adds` to `owner`'s edge list, dedup preserving first
    /// occurrence (never admitting a self-loop), and re-prune at
    /// [`PATCH_ALPHA`] if the list overflows the degree bound.
    fn patch_edges(&mut self, owner: u32, adds: &[u32]) {
        let Some(node) = self.nodes.get_mut(&owner) else {
            return;
        };
        for &a in adds {
            if a != owner {
                node.neighbors.push(a);
            }
        }
        let mut seen: HashSet<u32> = HashSet::with_capacity(node.neighbors.len());
        node.neighbors.retain(|x| seen.insert(*x));

        if node.neighbors.len() > self.max_degree {
            let owner_vector = node.vector.clone();
            let edges = node.neighbors.clone();
            let mut candidates: Vec<Candidate> = edges
                .iter()
                .filter_map(|&v| {
                    self.nodes.get(&v).map(|n| {
                        Candidate::new(
                            v,
                            distance::compute(self.metric, &n.vector, &owner_vector),
                        )
                    })
                })
                .collect();
            candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            self.robust_prune(owner, &mut candidates, PATCH_ALPHA);
        }
    }

    /// Scrub tombstoned ids from every neighbor list and forget them.
    ///
    /// Run periodically to reclaim the tombstone check from the search
    /// hot path. Lists are not re-pruned, so out-degrees may sit below
    /// the bound until the next insert or update touches them.
    pub fn batch_delete(&mut self) {
        if self.tombstones.is_empty() {
            return;
        }

        let tombstones = &self.tombstones;
        let mut scrubbed = 0usize;
        for node in self.nodes.values_mut() {
            let before = node.neighbors.len();
            node.neighbors.retain(|nb| !tombstones.contains(nb));
            scrubbed += before - node.neighbors.len();
        }
        debug!(
            swept = self.tombstones.len(),
            scrubbed, "cleared tombstones from neighbor lists"
        );
        self.tombstones.clear();
    }

    /// Fold `point` into the medoid tracker and, when the tracker (or
    /// `force`) says so, refresh the entry point with a cheap search
    /// toward the current centroid.
    pub fn try_medoid_compute(&self, point: &[f32], force: bool) {
        self.medoid.add(point);

        if force || self.medoid.should_recompute() {
            let centroid = self.medoid.centroid();
            let mut res = SearchResult::default();
            self.greedy_search(self.start_node(), &centroid, 1, REFRESH_BEAM, &mut res, None);
            if let Some(best) = res.nearest.first() {
                debug!(start = best.id, "refreshed entry point toward centroid");
                self.start.store(best.id, Ordering::Relaxed);
            }
        }
    }

    /// Check structural invariants: no duplicate neighbors, no
    /// out-degree above the bound. Intended for tests and for
    /// assertions after bulk operations.
    pub fn validate_graph(&self) -> bool {
        let mut seen: HashSet<u32> = HashSet::with_capacity(self.max_degree);
        for (&id, node) in &self.nodes {
            if node.neighbors.len() > self.max_degree {
                warn!(
                    node = id,
                    degree = node.neighbors.len(),
                    "out-degree exceeds the configured bound"
                );
                return false;
            }
            seen.clear();
            for &nb in &node.neighbors {
                if !seen.insert(nb) {
                    warn!(node = id, neighbor = nb, "duplicate neighbor");
                    return false;
                }
            }
        }
        true
    }

    /// Current entry point. Eventually consistent across a reseat.
    #[inline]
    #[must_use]
    pub fn start_node(&self) -> u32 {
        self.start.load(Ordering::Relaxed)
    }

    /// Copy of the node stored under `id`; an empty sentinel node for
    /// missing or tombstoned ids.
    #[must_use]
    pub fn node(&self, id: u32) -> Node {
        if self.tombstones.contains(&id) {
            return Node::default();
        }
        self.nodes.get(&id).cloned().unwrap_or_default()
    }

    /// Read-only view of the node store.
    #[must_use]
    pub fn node_map(&self) -> &HashMap<u32, Node> {
        &self.nodes
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Advisory: true when the tombstone backlog exceeds `threshold`
    /// as a fraction of live nodes, suggesting a
    /// [`batch_delete`](Vamana::batch_delete) sweep.
    #[must_use]
    pub fn needs_sweep(&self, threshold: f32) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        (self.tombstones.len() as f32 / self.nodes.len() as f32) > threshold
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            num_nodes: self.nodes.len(),
            num_tombstoned: self.tombstones.len(),
            dims: self.dims,
            max_degree: self.max_degree,
        }
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }
}

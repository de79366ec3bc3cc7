//! Greedy beam search over the graph.
//!
//! The hot path is allocation-free after warmup: the two priority
//! queues and the visited set live in thread-local scratch and are
//! reused across calls on the same thread. That reuse is a cache, not
//! a contract: the only externally visible behavior is correctness
//! under repeated invocation.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::distance;
use crate::visited::VisitedSetPool;

use super::Vamana;

/// A scored node, ephemeral to one search or prune call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: u32,
    pub distance: f32,
}

impl Candidate {
    #[must_use]
    pub fn new(id: u32, distance: f32) -> Self {
        Self { id, distance }
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap: larger distance = higher priority.
        // total_cmp gives IEEE 754 total ordering (NaN-safe).
        self.distance.total_cmp(&other.distance)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Nearest nodes found by a search, sorted best-first.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub nearest: Vec<Candidate>,
}

/// Admission gate consulted before a node may enter the result set.
///
/// The graph probes each id at most once per search. Implementations
/// must be pure and side-effect-free; an attribute lookup is fine, a
/// blocking call is not. Any `Fn(u32) -> bool` closure qualifies
/// through the blanket impl, so call sites usually pass
/// `Some(&|id: u32| ...)`.
pub trait SearchFilter: Sync {
    /// Whether the node with this id may be returned.
    fn accepts(&self, id: u32) -> bool;
}

impl<F> SearchFilter for F
where
    F: Fn(u32) -> bool + Sync,
{
    fn accepts(&self, id: u32) -> bool {
        self(id)
    }
}

/// Per-thread search state: frontier min-heap, bounded result
/// max-heap, and the visited-set free list.
struct SearchScratch {
    frontier: BinaryHeap<Reverse<Candidate>>,
    results: BinaryHeap<Candidate>,
    visited: VisitedSetPool,
}

impl SearchScratch {
    fn new() -> Self {
        Self {
            frontier: BinaryHeap::new(),
            results: BinaryHeap::new(),
            visited: VisitedSetPool::new(),
        }
    }
}

thread_local! {
    static SCRATCH: RefCell<SearchScratch> = RefCell::new(SearchScratch::new());
}

impl Vamana {
    /// Greedy beam search from `start` toward `query`.
    ///
    /// Explores with a frontier of unexpanded candidates (closest
    /// first) against a bounded pool of the best `l` nodes seen so
    /// far; stops when the closest unexpanded candidate is worse than
    /// the worst retained result. `out` is cleared, then filled
    /// best-first and truncated to `k`.
    ///
    /// Tombstoned ids are never admitted to the results but are still
    /// expanded through, so searches stay connected across recent
    /// deletes. The `filter` is likewise an admission test, not an
    /// expansion gate: a node failing it still contributes its
    /// neighbors to the frontier.
    ///
    /// An absent `start` yields an empty result. Ties between
    /// equidistant candidates are broken by heap order and are not
    /// part of the contract.
    pub fn greedy_search(
        &self,
        start: u32,
        query: &[f32],
        k: usize,
        l: usize,
        out: &mut SearchResult,
        filter: Option<&dyn SearchFilter>,
    ) {
        out.nearest.clear();
        let Some(start_node) = self.nodes.get(&start) else {
            return;
        };

        SCRATCH.with(|scratch| {
            let scratch = &mut *scratch.borrow_mut();
            scratch.frontier.clear();
            scratch.results.clear();
            let mut visited = scratch.visited.acquire(self.nodes.len());

            scratch.frontier.push(Reverse(Candidate::new(
                start,
                distance::compute(self.metric, &start_node.vector, query),
            )));
            visited.mark(start);

            // Once the result pool holds l entries, its worst distance
            // is the prune radius.
            let mut prune_radius = f32::INFINITY;

            while let Some(&Reverse(nn)) = scratch.frontier.peek() {
                if nn.distance > prune_radius {
                    break;
                }
                scratch.frontier.pop();

                let worst = scratch
                    .results
                    .peek()
                    .map(|c| c.distance)
                    .unwrap_or(f32::INFINITY);
                if (scratch.results.len() < l || nn.distance < worst)
                    && !self.tombstones.contains(&nn.id)
                {
                    if filter.map_or(true, |f| f.accepts(nn.id)) {
                        scratch.results.push(nn);
                    }
                    if scratch.results.len() > l {
                        scratch.results.pop();
                    }
                    if scratch.results.len() == l {
                        if let Some(w) = scratch.results.peek() {
                            prune_radius = w.distance;
                        }
                    }
                }

                let Some(node) = self.nodes.get(&nn.id) else {
                    continue;
                };
                for &nb in &node.neighbors {
                    if !visited.mark(nb) {
                        continue;
                    }
                    let Some(nb_node) = self.nodes.get(&nb) else {
                        continue;
                    };
                    scratch.frontier.push(Reverse(Candidate::new(
                        nb,
                        distance::compute(self.metric, &nb_node.vector, query),
                    )));
                }
            }

            // Drain worst-to-best, then flip to best-first.
            while let Some(c) = scratch.results.pop() {
                out.nearest.push(c);
            }
            out.nearest.reverse();
            out.nearest.truncate(k);

            scratch.visited.release(visited);
        });
    }
}

#[cfg(test)]
pub(crate) fn poison_visited_epochs(tag: u32) {
    SCRATCH.with(|scratch| scratch.borrow_mut().visited.poison_tags_for_test(tag));
}

//! Streaming Vamana: an in-memory graph index for approximate nearest
//! neighbor search with in-place updates.
//!
//! The index keeps a flat navigable graph in the DiskANN family: every
//! node holds at most `R` out-edges selected by alpha-pruning, and a
//! greedy beam search walks the graph from a maintained entry point.
//! Unlike build-once indices, the graph is mutated in place: inserts
//! splice new nodes in, deletes patch the surrounding neighborhood
//! instead of tombstoning-and-rebuilding, and a streaming medoid
//! tracker keeps the entry point near the data's center of mass as
//! the collection churns.
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`graph`] | the Vamana graph: search, insert, update, in-place delete |
//! | [`distance`] | metric dispatch (squared L2, inner product) |
//! | [`simd`] | SIMD distance kernels (via `innr`) with portable fallback |
//! | [`visited`] | epoch-tagged visited sets, pooled per thread |
//! | [`medoid`] | streaming centroid tracking for the entry point |
//!
//! # Example
//!
//! ```rust
//! use vamana::{Metric, SearchResult, Vamana, VamanaConfig};
//!
//! # fn main() -> vamana::Result<()> {
//! let mut index = Vamana::new(VamanaConfig {
//!     dims: 3,
//!     max_degree: 16,
//!     metric: Metric::L2,
//!     medoid_interval: 0,
//! })?;
//!
//! index.insert(1, vec![1.0, 0.0, 0.0], 32, 1.2);
//! index.insert(2, vec![0.0, 1.0, 0.0], 32, 1.2);
//!
//! let mut out = SearchResult::default();
//! index.greedy_search(index.start_node(), &[0.9, 0.1, 0.0], 1, 32, &mut out, None);
//! assert_eq!(out.nearest[0].id, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency contract
//!
//! Single-writer, many-reader. Searches borrow the graph immutably and
//! keep all scratch state (priority queues, visited sets) in
//! thread-local pools, so the hot path allocates nothing and takes no
//! locks. Writers must be serialized by the caller. The entry point is
//! published through a relaxed atomic: readers may observe a stale
//! value across a reseat, which only costs extra hops.
//!
//! # References
//!
//! - Subramanya et al. (2019): "DiskANN: Fast Accurate Billion-point
//!   Nearest Neighbor Search on a Single Node"
//! - Singh et al. (2021): "FreshDiskANN: A Fast and Accurate
//!   Graph-Based ANN Index for Streaming Similarity Search"
//! - Xu et al. (2025): "IP-DiskANN: In-Place Graph Index Updates for
//!   Streaming ANN"

pub mod distance;
pub mod error;
pub mod graph;
pub mod medoid;
pub mod simd;
pub mod visited;

pub use distance::Metric;
pub use error::{IndexError, Result};
pub use graph::{
    Candidate, GraphStats, Node, SearchFilter, SearchResult, Vamana, VamanaConfig,
};
pub use medoid::MedoidTracker;
pub use visited::{VisitedSet, VisitedSetPool};

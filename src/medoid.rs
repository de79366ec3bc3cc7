//! Streaming medoid tracking for entry-point maintenance.
//!
//! A Vamana graph enters every search through a single start node, and
//! recall degrades when that node drifts far from the data's center of
//! mass. Rather than recomputing a medoid over all vectors, the
//! tracker keeps a running coordinate-wise sum and count: `add` on
//! every insert, `sub` on every physical delete, and a countdown that
//! tells the graph when taking a fresh centroid is worth a cheap
//! search.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

const DEFAULT_INTERVAL: u64 = 10_000;

#[derive(Debug)]
struct State {
    /// Coordinate-wise Σ of tracked vectors.
    sum: Vec<f32>,
    /// Number of vectors contributing to the sum.
    n: u64,
}

/// Running centroid over the live vectors of a graph.
///
/// `add`/`sub`/`centroid` are serialized by one internal mutex, the
/// only lock in the index core. [`should_recompute`] reads a relaxed
/// atomic and may race; a missed zero just delays the refresh by one
/// call.
///
/// [`should_recompute`]: MedoidTracker::should_recompute
#[derive(Debug)]
pub struct MedoidTracker {
    state: Mutex<State>,
    interval: u64,
    countdown: AtomicU64,
}

impl MedoidTracker {
    /// Create a tracker for `dims`-dimensional vectors.
    ///
    /// `recompute_every` of 0 selects the default interval of 10 000
    /// operations.
    #[must_use]
    pub fn new(dims: usize, recompute_every: u64) -> Self {
        let interval = if recompute_every == 0 {
            DEFAULT_INTERVAL
        } else {
            recompute_every
        };
        Self {
            state: Mutex::new(State {
                sum: vec![0.0; dims],
                n: 0,
            }),
            interval,
            countdown: AtomicU64::new(interval),
        }
    }

    /// Fold an inserted vector into the running sum.
    pub fn add(&self, x: &[f32]) {
        {
            let mut state = self.state.lock();
            debug_assert_eq!(state.sum.len(), x.len());
            for (s, v) in state.sum.iter_mut().zip(x) {
                *s += v;
            }
            state.n += 1;
        }
        self.tick();
    }

    /// Remove a physically deleted vector from the running sum.
    pub fn sub(&self, x: &[f32]) {
        {
            let mut state = self.state.lock();
            debug_assert_eq!(state.sum.len(), x.len());
            for (s, v) in state.sum.iter_mut().zip(x) {
                *s -= v;
            }
            state.n = state.n.saturating_sub(1);
        }
        self.tick();
    }

    /// Advisory: true when enough operations have accumulated that the
    /// graph should refresh its entry point.
    #[inline]
    #[must_use]
    pub fn should_recompute(&self) -> bool {
        self.countdown.load(Ordering::Relaxed) == 0
    }

    /// Current centroid Σ/N; resets the countdown.
    ///
    /// Calling this with no tracked vectors is a contract violation
    /// (the graph only consults the tracker after at least one
    /// insert).
    #[must_use]
    pub fn centroid(&self) -> Vec<f32> {
        let state = self.state.lock();
        debug_assert!(state.n > 0, "centroid taken from an empty tracker");
        let scale = 1.0 / state.n as f32;
        let c = state.sum.iter().map(|s| s * scale).collect();
        self.countdown.store(self.interval, Ordering::Relaxed);
        c
    }

    /// Number of vectors currently contributing to the sum.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state.lock().n
    }

    /// Saturating countdown keeps the value in `[0, interval]`: a
    /// delete landing exactly on zero must not wrap the counter past
    /// the next refresh.
    #[inline]
    fn tick(&self) {
        let _ = self
            .countdown
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_sub(1))
            });
    }
}

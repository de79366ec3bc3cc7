//! Vector kernels behind the SIMD dispatch boundary.
//!
//! With the default `innr` feature the two primitive sums ([`dot`],
//! [`l2_squared`]) come from the `innr` crate, which carries the
//! per-architecture SIMD paths. Disabling the feature swaps in the
//! portable implementations below.
//!
//! Either backend accumulates in single precision and keeps the
//! reduction order fixed within one call, so a given input pair always
//! produces the same value on the same backend and the two backends
//! induce the same distance ordering.

#[cfg(feature = "innr")]
pub use innr::dot;
#[cfg(feature = "innr")]
pub use innr::l2_distance_squared as l2_squared;

#[cfg(not(feature = "innr"))]
mod portable {
    //! Scalar implementations used when `innr` is not available.

    /// Dot product Σ aᵢ·bᵢ.
    ///
    /// Slices are assumed to be the same length; the caller bears
    /// bounds responsibility.
    #[inline]
    #[must_use]
    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        let mut acc = 0.0f32;
        for (x, y) in a.iter().zip(b) {
            acc += x * y;
        }
        acc
    }

    /// Squared Euclidean distance Σ (aᵢ−bᵢ)².
    ///
    /// The square root is intentionally omitted: search only orders by
    /// distance, and the squared form preserves that ordering.
    #[inline]
    #[must_use]
    pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
        let mut acc = 0.0f32;
        for (x, y) in a.iter().zip(b) {
            let d = x - y;
            acc += d * d;
        }
        acc
    }
}

#[cfg(not(feature = "innr"))]
pub use portable::*;

//! Distance metrics for dense vectors.
//!
//! Both metrics are *ordering* forms, not true metrics: [`l2`] omits
//! the square root and [`ip`] is `1 - Σ aᵢbᵢ`, which is negative for
//! well-aligned vectors. Search only compares distances, so any
//! monotone form works; callers wanting cosine semantics normalize
//! their vectors before handing them to the index.

use serde::{Deserialize, Serialize};

use crate::simd;

/// Distance metric for dense vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Squared Euclidean distance Σ (aᵢ−bᵢ)².
    L2,
    /// Inner-product distance `1 − Σ aᵢbᵢ` (normalize inputs for
    /// cosine semantics).
    InnerProduct,
}

/// Compute the distance between two vectors under `metric`.
///
/// Slices are assumed to be the same length; the caller bears bounds
/// responsibility.
#[inline]
#[must_use]
pub fn compute(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::L2 => l2(a, b),
        Metric::InnerProduct => ip(a, b),
    }
}

/// Squared L2 distance.
#[inline]
#[must_use]
pub fn l2(a: &[f32], b: &[f32]) -> f32 {
    simd::l2_squared(a, b)
}

/// Inner-product distance `1 − Σ aᵢbᵢ`.
#[inline]
#[must_use]
pub fn ip(a: &[f32], b: &[f32]) -> f32 {
    1.0 - simd::dot(a, b)
}

/// Normalize a vector to unit L2 norm.
///
/// Zero vectors are returned unchanged rather than divided by zero.
#[inline]
#[must_use]
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let n = simd::dot(v, v).sqrt();
    if n < 1e-10 {
        return v.to_vec();
    }
    v.iter().map(|x| x / n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_is_squared() {
        let a = [1.0_f32, 0.0, 0.0];
        let b = [0.0_f32, 1.0, 0.0];
        assert!((l2(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn l2_zero_for_identical() {
        let a = [0.3_f32, -1.7, 2.5];
        assert_eq!(l2(&a, &a), 0.0);
    }

    #[test]
    fn ip_of_identical_unit_vector_is_zero() {
        let a = normalize(&[3.0_f32, 4.0]);
        assert!(ip(&a, &a).abs() < 1e-6);
    }

    #[test]
    fn ip_of_orthogonal_is_one() {
        let a = [1.0_f32, 0.0];
        let b = [0.0_f32, 1.0];
        assert!((ip(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn compute_dispatches() {
        let a = [1.0_f32, 0.0];
        let b = [0.0_f32, 1.0];
        assert_eq!(compute(Metric::L2, &a, &b), l2(&a, &b));
        assert_eq!(compute(Metric::InnerProduct, &a, &b), ip(&a, &b));
    }

    #[test]
    fn normalize_handles_zero() {
        let z = [0.0_f32; 4];
        assert_eq!(normalize(&z), z.to_vec());
    }
}

//! Distance kernels shared by the index engines.
//!
//! Both engines rank results by squared Euclidean (L2) distance: smaller is
//! closer, and dropping the square root preserves ordering while saving a
//! call per comparison. The plain L2 form is kept for callers that need
//! metric distances.

/// Compute squared Euclidean (L2) distance between two vectors.
#[inline]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Compute Euclidean (L2) distance between two vectors.
#[inline]
pub fn l2(a: &[f32], b: &[f32]) -> f32 {
    l2_squared(a, b).sqrt()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_squared_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(l2_squared(&v, &v), 0.0);
    }

    #[test]
    fn test_l2_squared_unit_axes() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!((l2_squared(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_is_sqrt_of_squared() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((l2(&a, &b) - 5.0).abs() < 1e-6);
        assert!((l2_squared(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_squared_ordering_matches_l2() {
        let q = vec![0.5, 0.5];
        let near = vec![0.6, 0.5];
        let far = vec![2.0, 2.0];
        assert!(l2_squared(&q, &near) < l2_squared(&q, &far));
        assert!(l2(&q, &near) < l2(&q, &far));
    }
}

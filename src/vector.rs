//! This is the vector math module
//! Provide Euclidean distance and dimension checks

use crate::error::{Result, StoreError};

/// Squared Euclidean distance
/// dist2 = sum((a[i] - b[i])^2) for i = 0..a.len()
/// Callers must pass slices of equal length
pub fn squared_euclidean(left: &[f32], right: &[f32]) -> f32 {
    debug_assert_eq!(left.len(), right.len());
    left.iter()
        .zip(right.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Euclidean Distance
/// dist = sqrt(sum((a[i] - b[i])^2))
pub fn euclidean_distance(left: &[f32], right: &[f32]) -> f32 {
    squared_euclidean(left, right).sqrt()
}

/// Check a vector against an expected dimension.
/// A zero-length vector is always rejected, as is any NaN or infinite
/// component.
pub fn check_dimension(vector: &[f32], expected: Option<usize>) -> Result<usize> {
    if vector.is_empty() {
        return Err(StoreError::EmptyVector);
    }

    if let Some(d) = expected.filter(|&d| d != vector.len()) {
        return Err(StoreError::DimensionMismatch {
            expected: d,
            actual: vector.len(),
        });
    }

    match vector.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(StoreError::NonFiniteValue { index }),
        None => Ok(vector.len()),
    }
}

#[cfg(test)]
mod vector_test {
    use super::*;

    #[test]
    fn test_euclidean_basic() {
        // [0,0] to [3,4] is the classic 3-4-5 triangle
        let result = euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((result - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_identical_is_zero() {
        let v = vec![1.5, -2.0, 3.25];
        assert_eq!(euclidean_distance(&v, &v), 0.0);
    }

    #[test]
    fn test_euclidean_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![7.0, 8.0, 9.0];
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
        // 3 * 6^2 = 108
        assert!((euclidean_distance(&a, &b) - 108f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_squared_euclidean_negative_values() {
        let result = squared_euclidean(&[-1.0, -1.0], &[1.0, 1.0]);
        assert!((result - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_check_dimension_establishes() {
        assert_eq!(check_dimension(&[1.0, 2.0], None).unwrap(), 2);
    }

    #[test]
    fn test_check_dimension_mismatch() {
        let result = check_dimension(&[1.0, 2.0], Some(3));
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_check_dimension_empty_vector() {
        assert!(matches!(check_dimension(&[], None), Err(StoreError::EmptyVector)));
        assert!(matches!(check_dimension(&[], Some(2)), Err(StoreError::EmptyVector)));
    }

    #[test]
    fn test_check_dimension_rejects_non_finite() {
        assert!(matches!(
            check_dimension(&[0.0, f32::NAN], None),
            Err(StoreError::NonFiniteValue { index: 1 })
        ));
        assert!(matches!(
            check_dimension(&[f32::INFINITY, 1.0], Some(2)),
            Err(StoreError::NonFiniteValue { index: 0 })
        ));
        assert!(matches!(
            check_dimension(&[1.0, f32::NEG_INFINITY], Some(2)),
            Err(StoreError::NonFiniteValue { index: 1 })
        ));
        // Length is reported before content
        assert!(matches!(
            check_dimension(&[f32::NAN], Some(2)),
            Err(StoreError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert_eq!(check_dimension(&[f32::MAX, f32::MIN], Some(2)).unwrap(), 2);
    }
}

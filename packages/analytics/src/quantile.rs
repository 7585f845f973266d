//! Percentile-bucket assignment (`NTILE` semantics).

use std::collections::HashMap;

use crate::AnalyticsError;

/// Assigns each entity a bucket in `1..=bucket_count` by ascending value.
///
/// Buckets are balanced the way SQL's `NTILE` balances them: with `n`
/// rows and `b` buckets, the first `n % b` buckets hold `n / b + 1` rows
/// and the rest hold `n / b`, so sizes differ by at most one. The sort is
/// stable, so rows with equal values keep their input order — callers
/// that need deterministic output across runs must pre-sort ties by a
/// secondary key (the similarity scorer uses population descending).
/// A `bucket_count` of zero is treated as one bucket.
///
/// Entities with a missing value must be filtered out by the caller.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] when `values` is empty.
pub fn rank(
    values: &[(usize, f64)],
    bucket_count: u32,
) -> Result<HashMap<usize, u32>, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::InsufficientData);
    }

    let mut sorted: Vec<(usize, f64)> = values.to_vec();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = sorted.len();
    let b = (bucket_count as usize).max(1);
    let base = n / b;
    let remainder = n % b;
    // Rows covered by the first `remainder` buckets of size `base + 1`.
    let pivot = remainder * (base + 1);

    Ok(sorted
        .into_iter()
        .enumerate()
        .map(|(row, (id, _))| {
            let bucket = if row < pivot {
                row / (base + 1)
            } else {
                remainder + (row - pivot) / base
            };
            #[allow(clippy::cast_possible_truncation)]
            let bucket = bucket as u32 + 1;
            (id, bucket)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(values: &[f64]) -> Vec<(usize, f64)> {
        values.iter().copied().enumerate().collect()
    }

    #[test]
    fn empty_population_is_an_error() {
        assert!(matches!(
            rank(&[], 100),
            Err(AnalyticsError::InsufficientData)
        ));
    }

    #[test]
    fn fewer_rows_than_buckets_get_one_bucket_each() {
        let buckets = rank(&population(&[5.0, 1.0, 3.0]), 100).unwrap();
        assert_eq!(buckets[&1], 1); // value 1.0
        assert_eq!(buckets[&2], 2); // value 3.0
        assert_eq!(buckets[&0], 3); // value 5.0
    }

    #[test]
    fn buckets_are_monotonic_with_value_order() {
        let values: Vec<f64> = (0..250).map(f64::from).collect();
        let buckets = rank(&population(&values), 100).unwrap();

        for i in 1..values.len() {
            assert!(buckets[&i] >= buckets[&(i - 1)]);
        }
        assert!(buckets.values().all(|&b| (1..=100).contains(&b)));
    }

    #[test]
    fn bucket_sizes_differ_by_at_most_one() {
        let values: Vec<f64> = (0..257).map(f64::from).collect();
        let buckets = rank(&population(&values), 100).unwrap();

        let mut sizes = HashMap::new();
        for bucket in buckets.values() {
            *sizes.entry(*bucket).or_insert(0_usize) += 1;
        }
        let min = sizes.values().min().unwrap();
        let max = sizes.values().max().unwrap();
        assert!(max - min <= 1, "sizes ranged {min}..{max}");
        // 257 rows over 100 buckets: 57 buckets of 3, 43 of 2.
        assert_eq!(sizes.values().filter(|&&s| s == 3).count(), 57);
        assert_eq!(sizes.values().filter(|&&s| s == 2).count(), 43);
    }

    #[test]
    fn equal_values_keep_input_order() {
        // Two rows per bucket; the tie lands in input order.
        let buckets = rank(&[(7, 1.0), (8, 1.0), (9, 2.0), (10, 3.0)], 2).unwrap();
        assert_eq!(buckets[&7], 1);
        assert_eq!(buckets[&8], 1);
        assert_eq!(buckets[&9], 2);
        assert_eq!(buckets[&10], 2);
    }

    #[test]
    fn custom_bucket_counts_are_respected() {
        let values: Vec<f64> = (0..8).map(f64::from).collect();
        let buckets = rank(&population(&values), 4).unwrap();
        assert_eq!(buckets[&0], 1);
        assert_eq!(buckets[&1], 1);
        assert_eq!(buckets[&6], 4);
        assert_eq!(buckets[&7], 4);
    }
}

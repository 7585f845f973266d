//! Percentile-bucket similarity scoring.
//!
//! For each feature, every candidate (query city included) is assigned a
//! percentile bucket over the candidate population; a candidate's score
//! is the sum of its absolute bucket gaps to the query, normalized by the
//! worst possible total gap and inverted into a 0-100 similarity
//! percentage.

use std::collections::HashMap;

use city_atlas_analytics_models::{FeatureBuckets, SimilarityConfig, SimilarityResult};
use city_atlas_catalog::FeatureCatalog;
use city_atlas_catalog_models::{CityKey, CityRecord, FeatureName};

use crate::{AnalyticsError, quantile};

/// Scores every eligible candidate against the query city, descending by
/// score, ties broken by descending combined population and then by key.
///
/// Candidacy follows one uniform policy: a city qualifies when it has at
/// least one recorded terrorism incident or its population reaches
/// `config.min_candidate_population`; the query city always qualifies.
/// Candidates missing any scored feature are dropped before ranking so
/// that every bucket table covers the same population.
///
/// # Errors
///
/// Returns [`AnalyticsError::CityNotFound`] when the query city is not
/// in the catalog or does not survive the feature completeness filter,
/// and [`AnalyticsError::InsufficientData`] when `config.features` is
/// empty.
pub fn score_all(
    catalog: &FeatureCatalog,
    query: &CityKey,
    config: &SimilarityConfig,
) -> Result<Vec<SimilarityResult>, AnalyticsError> {
    if config.features.is_empty() {
        return Err(AnalyticsError::InsufficientData);
    }

    let query_idx = catalog
        .index_of(query)
        .ok_or_else(|| AnalyticsError::city_not_found(query))?;

    let candidates = candidate_indices(catalog, query_idx, config);
    if !candidates.contains(&query_idx) {
        // The query city itself is missing a scored feature.
        return Err(AnalyticsError::city_not_found(query));
    }

    log::debug!(
        "Scoring {} candidates against {query} over {} features",
        candidates.len().saturating_sub(1),
        config.features.len()
    );

    // One quantile table per feature, all over the same population.
    let mut tables: Vec<(FeatureName, HashMap<usize, u32>)> =
        Vec::with_capacity(config.features.len());
    for &feature in &config.features {
        let mut column: Vec<(usize, f64)> = candidates
            .iter()
            .filter_map(|&idx| {
                catalog.cities()[idx]
                    .feature(feature)
                    .map(|value| (idx, value))
            })
            .collect();
        // Row-number tie policy: equal values order by population
        // descending so bucket assignment is deterministic across runs.
        column.sort_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| {
                    catalog.cities()[b.0]
                        .population
                        .cmp(&catalog.cities()[a.0].population)
                })
                .then_with(|| {
                    catalog.cities()[a.0]
                        .key
                        .folded()
                        .cmp(&catalog.cities()[b.0].key.folded())
                })
        });
        tables.push((feature, quantile::rank(&column, config.bucket_count)?));
    }

    let query_record = &catalog.cities()[query_idx];
    let feature_count = config.features.len();
    // A bucket gap spans at most `bucket_count - 1`, so rescaling the
    // mean gap to the 0-100 range keeps the score bounded for any
    // configured bucket count.
    let gap_scale = 100.0 / f64::from(config.bucket_count.max(1));

    let mut results: Vec<SimilarityResult> = candidates
        .iter()
        .filter(|&&idx| idx != query_idx)
        .map(|&idx| {
            let candidate = &catalog.cities()[idx];
            let mut gap_sum: u32 = 0;
            let buckets: Vec<FeatureBuckets> = tables
                .iter()
                .map(|(feature, table)| {
                    let query_bucket = table[&query_idx];
                    let candidate_bucket = table[&idx];
                    gap_sum += query_bucket.abs_diff(candidate_bucket);
                    FeatureBuckets {
                        feature: *feature,
                        query_bucket,
                        candidate_bucket,
                    }
                })
                .collect();

            #[allow(clippy::cast_precision_loss)]
            let score = round2(100.0 - f64::from(gap_sum) * gap_scale / feature_count as f64);

            SimilarityResult {
                query: query_record.key.clone(),
                candidate: candidate.key.clone(),
                score,
                buckets,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                combined_population(catalog, query_record, &b.candidate)
                    .cmp(&combined_population(catalog, query_record, &a.candidate))
            })
            .then_with(|| a.candidate.folded().cmp(&b.candidate.folded()))
    });

    Ok(results)
}

fn candidate_indices(
    catalog: &FeatureCatalog,
    query_idx: usize,
    config: &SimilarityConfig,
) -> Vec<usize> {
    catalog
        .cities()
        .iter()
        .enumerate()
        .filter(|(idx, record)| {
            *idx == query_idx
                || record.features.terrorism_attacks > 0
                || record.population >= config.min_candidate_population
        })
        .filter(|(_, record)| {
            config
                .features
                .iter()
                .all(|&feature| record.feature(feature).is_some())
        })
        .map(|(idx, _)| idx)
        .collect()
}

fn combined_population(catalog: &FeatureCatalog, query: &CityRecord, candidate: &CityKey) -> u64 {
    let candidate_population = catalog.get(candidate).map_or(0, |r| r.population);
    query.population + candidate_population
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use city_atlas_catalog_models::FeatureValues;

    #[allow(clippy::too_many_arguments)]
    fn city(
        name: &str,
        country: &str,
        population: u64,
        lat: f64,
        lon: f64,
        country_population: u64,
        attacks: u64,
        deaths: u64,
    ) -> CityRecord {
        CityRecord {
            key: CityKey::new(name, country),
            population,
            latitude: Some(lat),
            longitude: Some(lon),
            features: FeatureValues {
                terrorism_attacks: attacks,
                terrorism_deaths: deaths,
                country_population: Some(country_population),
                ..FeatureValues::default()
            },
        }
    }

    /// A candidate population where every city qualifies on its own
    /// (attacks >= 1), so swapping the query city never changes the
    /// ranking population.
    fn fixture() -> FeatureCatalog {
        const US: u64 = 330_000_000;
        FeatureCatalog::from_records(
            vec![
                city("Boston", "United States", 650_000, 42.36, -71.06, US, 5, 10),
                city(
                    "Philadelphia",
                    "United States",
                    1_580_000,
                    39.95,
                    -75.17,
                    US,
                    6,
                    12,
                ),
                city(
                    "New York",
                    "United States",
                    8_400_000,
                    40.71,
                    -74.01,
                    US,
                    30,
                    200,
                ),
                city("Chicago", "United States", 2_700_000, 41.88, -87.63, US, 8, 15),
                city("Miami", "United States", 450_000, 25.76, -80.19, US, 3, 4),
                city(
                    "Reykjavik",
                    "Iceland",
                    130_000,
                    64.15,
                    -21.94,
                    370_000,
                    1,
                    0,
                ),
                city("London", "United Kingdom", 8_900_000, 51.51, -0.13, 67_000_000, 40, 60),
                city("Lima", "Peru", 9_700_000, -12.05, -77.04, 33_000_000, 12, 30),
            ],
            vec![],
        )
    }

    fn score_of(results: &[SimilarityResult], city: &str) -> f64 {
        results
            .iter()
            .find(|r| r.candidate.city == city)
            .unwrap()
            .score
    }

    #[test]
    fn query_city_never_appears_in_its_own_results() {
        let catalog = fixture();
        let results = score_all(
            &catalog,
            &CityKey::new("Boston", "United States"),
            &SimilarityConfig::default(),
        )
        .unwrap();

        assert_eq!(results.len(), catalog.len() - 1);
        assert!(
            results
                .iter()
                .all(|r| r.candidate != CityKey::new("boston", "united states"))
        );
    }

    #[test]
    fn philadelphia_beats_reykjavik_for_boston() {
        let results = score_all(
            &fixture(),
            &CityKey::new("Boston", "United States"),
            &SimilarityConfig::default(),
        )
        .unwrap();

        assert!(score_of(&results, "Philadelphia") > score_of(&results, "Reykjavik"));
    }

    #[test]
    fn scores_are_bounded_and_sorted_descending() {
        let results = score_all(
            &fixture(),
            &CityKey::new("Boston", "United States"),
            &SimilarityConfig::default(),
        )
        .unwrap();

        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(
            results
                .iter()
                .all(|r| (0.0..=100.0).contains(&r.score))
        );
    }

    #[test]
    fn scores_stay_bounded_for_large_bucket_counts() {
        // More buckets than the 100-point score range: with one scored
        // feature over 120 cities, the widest gap spans 119 buckets and
        // must still map into [0, 100].
        let records: Vec<CityRecord> = (0..120_u64)
            .map(|i| {
                city(
                    &format!("City{i:03}"),
                    "X",
                    100_000 + i * 1_000,
                    1.0,
                    1.0,
                    10,
                    1,
                    0,
                )
            })
            .collect();
        let catalog = FeatureCatalog::from_records(records, vec![]);
        let config = SimilarityConfig {
            features: vec![FeatureName::Population],
            bucket_count: 500,
            ..SimilarityConfig::default()
        };

        let results = score_all(&catalog, &CityKey::new("City000", "X"), &config).unwrap();
        assert_eq!(results.len(), 119);
        assert!(results.iter().all(|r| (0.0..=100.0).contains(&r.score)));
    }

    #[test]
    fn score_is_symmetric_over_the_same_population() {
        let catalog = fixture();
        let config = SimilarityConfig::default();

        let from_boston = score_all(&catalog, &CityKey::new("Boston", "United States"), &config)
            .map(|r| score_of(&r, "Philadelphia"))
            .unwrap();
        let from_philadelphia = score_all(
            &catalog,
            &CityKey::new("Philadelphia", "United States"),
            &config,
        )
        .map(|r| score_of(&r, "Boston"))
        .unwrap();

        assert!((from_boston - from_philadelphia).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_city_is_a_distinct_not_found_error() {
        let err = score_all(
            &fixture(),
            &CityKey::new("Atlantis", "Nowhere"),
            &SimilarityConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, AnalyticsError::CityNotFound { .. }));
    }

    #[test]
    fn query_missing_a_scored_feature_is_not_found() {
        let mut records = vec![
            city("A", "X", 1_000_000, 1.0, 1.0, 10, 1, 1),
            city("B", "X", 2_000_000, 2.0, 2.0, 10, 1, 1),
        ];
        // Query city has no coordinates, so it cannot be ranked on the
        // latitude/longitude features.
        records.push(CityRecord {
            key: CityKey::new("NoCoords", "X"),
            population: 3_000_000,
            latitude: None,
            longitude: None,
            features: FeatureValues {
                terrorism_attacks: 1,
                country_population: Some(10),
                ..FeatureValues::default()
            },
        });
        let catalog = FeatureCatalog::from_records(records, vec![]);

        let err = score_all(
            &catalog,
            &CityKey::new("NoCoords", "X"),
            &SimilarityConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::CityNotFound { .. }));
    }

    #[test]
    fn below_threshold_inactive_cities_are_not_candidates() {
        let mut records = vec![
            city("Big", "X", 9_000_000, 1.0, 1.0, 10, 2, 2),
            city("Mid", "X", 5_000_000, 2.0, 2.0, 10, 3, 3),
            city("Query", "X", 200_000, 3.0, 3.0, 10, 1, 1),
        ];
        // No attacks and population below the threshold: excluded.
        records.push(city("Quiet", "X", 50_000, 4.0, 4.0, 10, 0, 0));
        let catalog = FeatureCatalog::from_records(records, vec![]);

        let results = score_all(
            &catalog,
            &CityKey::new("Query", "X"),
            &SimilarityConfig::default(),
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.candidate.city != "Quiet"));
    }

    #[test]
    fn identical_cities_score_one_hundred() {
        // Two indistinguishable cities plus spread, scored on a single
        // feature both share a bucket for.
        let catalog = FeatureCatalog::from_records(
            vec![
                city("A", "X", 1_000_000, 1.0, 1.0, 10, 1, 1),
                city("B", "X", 1_000_000, 1.0, 1.0, 10, 1, 1),
            ],
            vec![],
        );
        let config = SimilarityConfig {
            features: vec![FeatureName::Population],
            bucket_count: 1,
            ..SimilarityConfig::default()
        };

        let results = score_all(&catalog, &CityKey::new("A", "X"), &config).unwrap();
        assert!((results[0].score - 100.0).abs() < f64::EPSILON);
    }
}

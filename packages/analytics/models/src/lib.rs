#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query parameter and result types for the analytics engine.
//!
//! Everything here is plain data: the engine computes these per request
//! and never persists them.

use city_atlas_catalog_models::{CityKey, FeatureName};
use serde::{Deserialize, Serialize};

/// Default minimum population for a city to enter the similarity
/// candidate set when it has no recorded terrorism activity.
pub const DEFAULT_MIN_CANDIDATE_POPULATION: u64 = 100_000;

/// Default number of percentile buckets.
pub const DEFAULT_BUCKET_COUNT: u32 = 100;

/// Tuning for the similarity scorer.
///
/// The candidate population is deliberately restricted so that the
/// percentile buckets stay meaningful: a city qualifies when it has at
/// least one recorded terrorism incident or its population reaches
/// `min_candidate_population`; the query city always qualifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Features that contribute to the score, in order.
    pub features: Vec<FeatureName>,
    /// Population threshold for candidacy without terrorism activity.
    pub min_candidate_population: u64,
    /// Percentile bucket count.
    pub bucket_count: u32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            features: vec![
                FeatureName::Population,
                FeatureName::Latitude,
                FeatureName::Longitude,
                FeatureName::CountryPopulation,
                FeatureName::TerrorismAttacks,
                FeatureName::TerrorismDeaths,
            ],
            min_candidate_population: DEFAULT_MIN_CANDIDATE_POPULATION,
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

/// The buckets one feature assigned to the query and a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBuckets {
    /// The feature these buckets belong to.
    pub feature: FeatureName,
    /// Bucket assigned to the query city.
    pub query_bucket: u32,
    /// Bucket assigned to the candidate city.
    pub candidate_bucket: u32,
}

/// One scored candidate for a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// The query city.
    pub query: CityKey,
    /// The candidate city.
    pub candidate: CityKey,
    /// Similarity score in `[0, 100]`, rounded to 2 decimal places.
    pub score: f64,
    /// The per-feature buckets the score was derived from.
    pub buckets: Vec<FeatureBuckets>,
}

/// Which level of the missing-value fallback chain produced a cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    /// The city had a direct cost-of-living value.
    Direct,
    /// Estimated from the 3 nearest neighbors.
    Interpolated,
    /// Mean over the city's country.
    CountryAverage,
    /// Mean over all cities with a direct value.
    GlobalAverage,
}

/// One city in the cheapest-cities ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityCost {
    /// The city.
    pub key: CityKey,
    /// The effective cost used for ranking.
    pub cost: f64,
    /// Where the effective cost came from.
    pub basis: CostBasis,
}

/// A paired per-feature value row for the two-city comparison export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Metric label (e.g. `population`, `average_temperature`).
    pub category: String,
    /// Value for the first city, when present.
    pub left: Option<f64>,
    /// Value for the second city, when present.
    pub right: Option<f64>,
}

/// A closed numeric range predicate over one feature.
///
/// Both bounds are optional; an absent bound is unbounded on that side.
/// `include_missing` decides whether a city missing this feature passes
/// the predicate — the choice is per feature, not per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// The feature the range applies to.
    pub feature: FeatureName,
    /// Inclusive lower bound.
    pub min: Option<f64>,
    /// Inclusive upper bound.
    pub max: Option<f64>,
    /// Whether a missing value passes this predicate.
    pub include_missing: bool,
}

impl FilterPredicate {
    /// Creates a predicate with the reference missing-data policy for
    /// the feature: location/climate/population metrics exclude missing
    /// records, the sparse index metrics include them.
    #[must_use]
    pub const fn for_feature(feature: FeatureName, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            feature,
            min,
            max,
            include_missing: Self::default_include_missing(feature),
        }
    }

    /// The default policy: dense metrics every city is expected to carry
    /// (population, location, climate) exclude missing records; the sparse
    /// metric tables (crime, safety, cost, terrorism deaths) include them.
    #[must_use]
    pub const fn default_include_missing(feature: FeatureName) -> bool {
        !matches!(
            feature,
            FeatureName::Population
                | FeatureName::Latitude
                | FeatureName::Longitude
                | FeatureName::SummerTemp
                | FeatureName::WinterTemp
        )
    }
}

/// A preference filter request: every predicate must pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceQuery {
    /// Range predicates, applied independently per feature.
    pub predicates: Vec<FilterPredicate>,
    /// Optional pagination.
    pub page: Option<Page>,
}

/// 1-indexed pagination window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    /// Page number, starting at 1.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
}

impl Page {
    /// Offset of the first row of this page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.page_size as usize) * (self.page as usize).saturating_sub(1)
    }

    /// Applies the window to an already-ordered result set.
    #[must_use]
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size as usize)
            .collect()
    }
}

/// Applies optional pagination; `None` returns the full ordered set.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: Option<Page>) -> Vec<T> {
    match page {
        Some(page) => page.apply(items),
        None => items,
    }
}

//! Multi-predicate range filtering over partially-missing feature columns.

use city_atlas_analytics_models::{FilterPredicate, PreferenceQuery, paginate};
use city_atlas_catalog::FeatureCatalog;
use city_atlas_catalog_models::CityRecord;

use crate::AnalyticsError;

/// Filters the catalog to the cities passing every predicate, sorted
/// descending by population, optionally paginated.
///
/// A record passes a predicate when its value lies inside the range, or
/// when the value is missing and that predicate's `include_missing` is
/// set. Missing-data handling is strictly feature-local: a record with
/// one missing and one present metric is judged per predicate.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidRange`] when any predicate has
/// `min > max`.
pub fn filter<'a>(
    catalog: &'a FeatureCatalog,
    query: &PreferenceQuery,
) -> Result<Vec<&'a CityRecord>, AnalyticsError> {
    for predicate in &query.predicates {
        if let (Some(min), Some(max)) = (predicate.min, predicate.max)
            && min > max
        {
            return Err(AnalyticsError::InvalidRange {
                feature: predicate.feature,
            });
        }
    }

    let mut matches: Vec<&CityRecord> = catalog
        .cities()
        .iter()
        .filter(|record| query.predicates.iter().all(|p| passes(record, p)))
        .collect();

    matches.sort_by(|a, b| {
        b.population
            .cmp(&a.population)
            .then_with(|| a.key.folded().cmp(&b.key.folded()))
    });

    log::debug!(
        "Preference filter matched {} of {} cities",
        matches.len(),
        catalog.len()
    );

    Ok(paginate(matches, query.page))
}

fn passes(record: &CityRecord, predicate: &FilterPredicate) -> bool {
    match record.feature(predicate.feature) {
        Some(value) => {
            predicate.min.is_none_or(|min| value >= min)
                && predicate.max.is_none_or(|max| value <= max)
        }
        None => predicate.include_missing,
    }
}

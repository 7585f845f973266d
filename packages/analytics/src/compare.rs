//! Two-city comparison export.
//!
//! Produces paired per-feature values suitable for direct charting.
//! Missing metrics stay `None` here; sentinel encoding for legacy
//! consumers happens at the presentation boundary.

use city_atlas_analytics_models::ComparisonRow;
use city_atlas_catalog::FeatureCatalog;
use city_atlas_catalog_models::{CityKey, CityRecord};

use crate::AnalyticsError;

/// Compares two cities feature by feature.
///
/// Rows cover population, cost of living, recorded terrorism attacks,
/// crime index, and average annual temperature (mean of the summer and
/// winter means where both are present).
///
/// # Errors
///
/// Returns [`AnalyticsError::CityNotFound`] when either city is absent
/// from the catalog.
#[allow(clippy::cast_precision_loss)]
pub fn compare(
    catalog: &FeatureCatalog,
    left: &CityKey,
    right: &CityKey,
) -> Result<Vec<ComparisonRow>, AnalyticsError> {
    let left_record = catalog
        .get(left)
        .ok_or_else(|| AnalyticsError::city_not_found(left))?;
    let right_record = catalog
        .get(right)
        .ok_or_else(|| AnalyticsError::city_not_found(right))?;

    let row = |category: &str, value: fn(&CityRecord) -> Option<f64>| ComparisonRow {
        category: category.to_string(),
        left: value(left_record),
        right: value(right_record),
    };

    Ok(vec![
        row("population", |r| Some(r.population as f64)),
        row("cost_of_living", |r| r.features.cost_of_living_index),
        row("terrorism_attacks", |r| {
            Some(r.features.terrorism_attacks as f64)
        }),
        row("crime_index", |r| r.features.crime_index),
        row("average_temperature", annual_mean),
    ])
}

/// Mean annual temperature from the seasonal means: the average of both
/// when both are present, whichever one exists otherwise.
fn annual_mean(record: &CityRecord) -> Option<f64> {
    match (
        record.features.avg_summer_temp,
        record.features.avg_winter_temp,
    ) {
        (Some(summer), Some(winter)) => Some(f64::midpoint(summer, winter)),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

//! Cheapest-quartile selection over effective cost of living.
//!
//! Every city gets an effective cost through a fixed fallback chain
//! (direct value, then 3-nearest-neighbor interpolation, then country
//! average, then global average), and the cheapest quartile is selected
//! by two successive median splits. The double median is the compatible
//! algorithm, not an approximation of `PERCENTILE_CONT(0.25)` — existing
//! consumers depend on its behavior over skewed distributions.

use city_atlas_analytics_models::{CityCost, CostBasis, Page, paginate};
use city_atlas_catalog::FeatureCatalog;
use city_atlas_catalog_models::{CityRecord, FeatureName};
use city_atlas_spatial::NeighborIndex;

use crate::AnalyticsError;

/// Resolves the effective cost of living for one city.
///
/// The fallback chain is applied in exactly this order: direct value,
/// spatial interpolation, country average, global average. The
/// interpolation level only fires when `index` was built over
/// [`FeatureName::CostOfLiving`]; an index over any other metric is
/// skipped rather than mixed into the cost chain. `None` means the
/// whole catalog carries no cost data at all.
#[must_use]
pub fn effective_cost(
    catalog: &FeatureCatalog,
    index: &NeighborIndex,
    record: &CityRecord,
) -> Option<(f64, CostBasis)> {
    if let Some(direct) = record.features.cost_of_living_index {
        return Some((direct, CostBasis::Direct));
    }
    if index.feature() == FeatureName::CostOfLiving
        && let Ok(interpolated) = index.estimate_record(record)
    {
        return Some((interpolated.estimate, CostBasis::Interpolated));
    }
    if let Some(country) = catalog.country_average(FeatureName::CostOfLiving, &record.key.country)
    {
        return Some((country, CostBasis::CountryAverage));
    }
    if let Some(global) = catalog.global_average(FeatureName::CostOfLiving) {
        return Some((global, CostBasis::GlobalAverage));
    }
    None
}

/// Selects the cheapest (approximately) quartile of cities by effective
/// cost, ascending, optionally paginated.
///
/// Two-stage median split: keep cities at or below the median effective
/// cost, then keep those at or below the median of that subset.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] when no city resolves to
/// an effective cost (i.e. the catalog has no cost data at all).
pub fn select_cheapest(
    catalog: &FeatureCatalog,
    index: &NeighborIndex,
    page: Option<Page>,
) -> Result<Vec<CityCost>, AnalyticsError> {
    let mut costs: Vec<CityCost> = catalog
        .cities()
        .iter()
        .filter_map(|record| {
            let resolved = effective_cost(catalog, index, record);
            if resolved.is_none() {
                log::debug!("No effective cost for {}; excluded", record.key);
            }
            resolved.map(|(cost, basis)| CityCost {
                key: record.key.clone(),
                cost,
                basis,
            })
        })
        .collect();

    if costs.is_empty() {
        return Err(AnalyticsError::InsufficientData);
    }

    let first = median(costs.iter().map(|c| c.cost));
    costs.retain(|c| c.cost <= first);
    let second = median(costs.iter().map(|c| c.cost));
    costs.retain(|c| c.cost <= second);

    costs.sort_by(|a, b| {
        a.cost
            .total_cmp(&b.cost)
            .then_with(|| a.key.folded().cmp(&b.key.folded()))
    });

    log::debug!(
        "Cheapest quartile: {} cities (medians {first:.2}, {second:.2})",
        costs.len()
    );

    Ok(paginate(costs, page))
}

/// `PERCENTILE_CONT(0.5)` median: mean of the two middle values for an
/// even count. Callers guarantee a non-empty iterator.
fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n % 2 == 0 {
        f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
    } else {
        sorted[n / 2]
    }
}

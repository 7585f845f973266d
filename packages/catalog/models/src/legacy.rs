//! Sentinel encoding for legacy consumers.
//!
//! The original API surfaced missing metrics as `-1` instead of `null`.
//! Engine logic never sees that encoding; these helpers translate
//! `Option` values at the final serialization boundary only.

use serde_json::{Value, json};

use crate::CityRecord;

/// Encodes an optional metric the way the legacy payloads expect:
/// the value when present, `-1` when missing.
#[must_use]
pub fn sentinel(value: Option<f64>) -> Value {
    value.map_or_else(|| json!(-1), |v| json!(v))
}

/// Builds the legacy city-details payload with `-1` sentinels for
/// missing metrics.
#[must_use]
pub fn legacy_city_details(record: &CityRecord) -> Value {
    json!({
        "city": record.key.city,
        "country": record.key.country,
        "city_population": record.population,
        "cost_of_living_index": sentinel(record.features.cost_of_living_index),
        "crime_index": sentinel(record.features.crime_index),
        "safety_index": sentinel(record.features.safety_index),
    })
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics over the city feature catalog.
//!
//! Four operations, each computed fresh per request over the read-only
//! [`city_atlas_catalog::FeatureCatalog`]:
//!
//! - [`similarity::score_all`] — percentile-bucket similarity between a
//!   query city and a filtered candidate population;
//! - [`quartile::select_cheapest`] — two-stage-median cheapest-quartile
//!   selection with a missing-cost fallback chain;
//! - [`preference::filter`] — multi-predicate range filtering with
//!   feature-local missing-data policy;
//! - [`compare::compare`] — paired per-feature values for two cities.
//!
//! Missing feature values flow through `Option`s; the error taxonomy
//! below covers only genuinely unanswerable requests.

pub mod compare;
pub mod preference;
pub mod quantile;
pub mod quartile;
pub mod similarity;

use city_atlas_catalog_models::{CityKey, FeatureName};
use thiserror::Error;

/// Errors that can occur during analytics operations.
///
/// All of these are recoverable at the presentation boundary; none are
/// fatal to the process.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A ranking population was empty.
    #[error("Insufficient data: ranking population is empty")]
    InsufficientData,

    /// The requested city is absent from the catalog or from the
    /// filtered candidate population.
    #[error("City not found: {city}, {country}")]
    CityNotFound {
        /// Requested city name.
        city: String,
        /// Requested country name.
        country: String,
    },

    /// A range predicate had `min > max`.
    #[error("Invalid range for {feature}: min exceeds max")]
    InvalidRange {
        /// The feature whose range was inverted.
        feature: FeatureName,
    },
}

impl AnalyticsError {
    /// Builds a [`Self::CityNotFound`] from a key.
    #[must_use]
    pub fn city_not_found(key: &CityKey) -> Self {
        Self::CityNotFound {
            city: key.city.clone(),
            country: key.country.clone(),
        }
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core city/country record types for the city-atlas analytics engine.
//!
//! Defines the [`CityKey`] identity pair, the typed per-city feature set,
//! and the raw CSV row shapes the catalog loader consumes. Missing metrics
//! are `Option::None` everywhere inside the engine; the legacy `-1`
//! sentinel encoding lives in [`legacy`] and is applied only when
//! producing external payloads.

pub mod legacy;

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Case-insensitive `(city, country)` identity pair.
///
/// Equality and hashing fold ASCII case, so `("boston", "UNITED STATES")`
/// and `("Boston", "United States")` are the same key. The original casing
/// is preserved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityKey {
    /// City name as it appeared in the source data.
    pub city: String,
    /// Country name as it appeared in the source data.
    pub country: String,
}

impl CityKey {
    /// Creates a key from city and country names.
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// Lowercased `(city, country)` form used for deterministic ordering.
    #[must_use]
    pub fn folded(&self) -> (String, String) {
        (
            self.city.to_ascii_lowercase(),
            self.country.to_ascii_lowercase(),
        )
    }
}

impl PartialEq for CityKey {
    fn eq(&self, other: &Self) -> bool {
        self.city.eq_ignore_ascii_case(&other.city)
            && self.country.eq_ignore_ascii_case(&other.country)
    }
}

impl Eq for CityKey {}

impl Hash for CityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.city.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0);
        for b in self.country.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl std::fmt::Display for CityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// A rankable per-city metric.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureName {
    /// City population.
    Population,
    /// City latitude in degrees.
    Latitude,
    /// City longitude in degrees.
    Longitude,
    /// Population of the city's country.
    CountryPopulation,
    /// Number of recorded terrorism incidents.
    TerrorismAttacks,
    /// Total deaths from recorded terrorism incidents.
    TerrorismDeaths,
    /// Numbeo-style cost of living index.
    CostOfLiving,
    /// Crime index.
    CrimeIndex,
    /// Safety index.
    SafetyIndex,
    /// Mean June/July/August temperature.
    SummerTemp,
    /// Mean December/January/February temperature.
    WinterTemp,
}

/// Optional scalar metrics attached to a city.
///
/// Terrorism counters default to zero for cities with no recorded
/// incidents; every other metric is either present or `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureValues {
    /// Cost of living index.
    pub cost_of_living_index: Option<f64>,
    /// Crime index.
    pub crime_index: Option<f64>,
    /// Safety index.
    pub safety_index: Option<f64>,
    /// Mean summer (Jun/Jul/Aug) temperature.
    pub avg_summer_temp: Option<f64>,
    /// Mean winter (Dec/Jan/Feb) temperature.
    pub avg_winter_temp: Option<f64>,
    /// Recorded terrorism incidents.
    pub terrorism_attacks: u64,
    /// Total deaths across recorded incidents.
    pub terrorism_deaths: u64,
    /// Population of the containing country, when known.
    pub country_population: Option<u64>,
}

/// A fully-loaded city record: identity, location, and feature set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityRecord {
    /// Identity pair.
    pub key: CityKey,
    /// City population.
    pub population: u64,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Optional per-city metrics.
    pub features: FeatureValues,
}

impl CityRecord {
    /// Returns the value of a feature, or `None` when the metric is
    /// missing for this city.
    ///
    /// Counters (population, terrorism) are always present and widen to
    /// `f64` here so that every feature ranks through the same code path.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn feature(&self, feature: FeatureName) -> Option<f64> {
        match feature {
            FeatureName::Population => Some(self.population as f64),
            FeatureName::Latitude => self.latitude,
            FeatureName::Longitude => self.longitude,
            FeatureName::CountryPopulation => {
                self.features.country_population.map(|p| p as f64)
            }
            FeatureName::TerrorismAttacks => Some(self.features.terrorism_attacks as f64),
            FeatureName::TerrorismDeaths => Some(self.features.terrorism_deaths as f64),
            FeatureName::CostOfLiving => self.features.cost_of_living_index,
            FeatureName::CrimeIndex => self.features.crime_index,
            FeatureName::SafetyIndex => self.features.safety_index,
            FeatureName::SummerTemp => self.features.avg_summer_temp,
            FeatureName::WinterTemp => self.features.avg_winter_temp,
        }
    }
}

/// A country record from the country table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Country name.
    pub name: String,
    /// Country population.
    pub population: Option<u64>,
    /// Latitude of the country centroid.
    pub latitude: Option<f64>,
    /// Longitude of the country centroid.
    pub longitude: Option<f64>,
}

/// Raw row from `cities.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct CityRow {
    /// City name.
    pub city: String,
    /// Country name.
    pub country: String,
    /// City population.
    pub city_population: Option<u64>,
    /// Latitude in degrees.
    pub city_latitude: Option<f64>,
    /// Longitude in degrees.
    pub city_longitude: Option<f64>,
}

/// Raw row from `countries.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryRow {
    /// Country name.
    pub country_name: String,
    /// Country population.
    pub population: Option<u64>,
    /// Latitude of the country centroid.
    pub latitude: Option<f64>,
    /// Longitude of the country centroid.
    pub longitude: Option<f64>,
}

/// Raw row from `cost_of_living.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct CostOfLivingRow {
    /// City name.
    pub city: String,
    /// Country name.
    pub country: String,
    /// Cost of living index.
    pub cost_of_living_index: Option<f64>,
}

/// Raw row from `crime_index.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct CrimeIndexRow {
    /// City name.
    pub city: String,
    /// Country name.
    pub country: String,
    /// Crime index.
    pub crime_index: Option<f64>,
    /// Safety index.
    pub safety_index: Option<f64>,
}

/// Raw monthly row from `city_temperature.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureRow {
    /// City name.
    pub city: String,
    /// Country name.
    pub country: String,
    /// Calendar month, 1-12.
    pub month: u8,
    /// Mean temperature for that month.
    pub avg_temperature: Option<f64>,
}

/// Raw per-incident row from `terrorism.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct TerrorismRow {
    /// City name.
    pub city: String,
    /// Country name.
    pub country: String,
    /// Deaths in this incident.
    pub nkill: Option<u64>,
}

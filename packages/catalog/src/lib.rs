#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Read-only typed view over the per-city and per-country attribute tables.
//!
//! The catalog is built once from the raw CSV tables (see [`load`]) and
//! never mutated afterwards, so it can be shared freely across worker
//! threads. Duplicate `(city, country)` rows in the source data are
//! resolved deterministically by keeping the highest-population record.

pub mod load;

use std::collections::HashMap;

use city_atlas_catalog_models::{CityKey, CityRecord, CountryRecord, FeatureName};

/// Errors that can occur while loading the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// I/O error reading a source table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Immutable, indexed view over all loaded city and country records.
pub struct FeatureCatalog {
    records: Vec<CityRecord>,
    by_key: HashMap<CityKey, usize>,
    countries: HashMap<String, CountryRecord>,
}

impl FeatureCatalog {
    /// Builds a catalog from in-memory records.
    ///
    /// Duplicate keys are collapsed to the highest-population record
    /// (first occurrence wins on equal population). Each surviving record
    /// gets its `country_population` resolved from the country table
    /// unless the loader already filled it in.
    #[must_use]
    pub fn from_records(records: Vec<CityRecord>, countries: Vec<CountryRecord>) -> Self {
        let countries: HashMap<String, CountryRecord> = countries
            .into_iter()
            .map(|c| (c.name.to_ascii_lowercase(), c))
            .collect();

        let mut deduped: Vec<CityRecord> = Vec::with_capacity(records.len());
        let mut by_key: HashMap<CityKey, usize> = HashMap::with_capacity(records.len());

        for mut record in records {
            if record.features.country_population.is_none() {
                record.features.country_population = countries
                    .get(&record.key.country.to_ascii_lowercase())
                    .and_then(|c| c.population);
            }

            match by_key.get(&record.key) {
                Some(&idx) => {
                    if record.population > deduped[idx].population {
                        log::debug!(
                            "Duplicate record for {}: keeping population {}",
                            record.key,
                            record.population
                        );
                        deduped[idx] = record;
                    }
                }
                None => {
                    by_key.insert(record.key.clone(), deduped.len());
                    deduped.push(record);
                }
            }
        }

        Self {
            records: deduped,
            by_key,
            countries,
        }
    }

    /// Looks up a city record by key, case-insensitively.
    #[must_use]
    pub fn get(&self, key: &CityKey) -> Option<&CityRecord> {
        self.by_key.get(key).map(|&idx| &self.records[idx])
    }

    /// Returns the dense index of a city, usable with [`Self::cities`].
    #[must_use]
    pub fn index_of(&self, key: &CityKey) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    /// All city records, in load order.
    #[must_use]
    pub fn cities(&self) -> &[CityRecord] {
        &self.records
    }

    /// Looks up a country record by name, case-insensitively.
    #[must_use]
    pub fn country(&self, name: &str) -> Option<&CountryRecord> {
        self.countries.get(&name.to_ascii_lowercase())
    }

    /// Bulk scan of one feature column: `(record index, value)` pairs for
    /// every city where the metric is present.
    #[must_use]
    pub fn feature_column(&self, feature: FeatureName) -> Vec<(usize, f64)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| record.feature(feature).map(|v| (idx, v)))
            .collect()
    }

    /// Mean of a feature across the cities of one country, over present
    /// values only. `None` when no city in that country carries the metric.
    #[must_use]
    pub fn country_average(&self, feature: FeatureName, country: &str) -> Option<f64> {
        mean(
            self.records
                .iter()
                .filter(|r| r.key.country.eq_ignore_ascii_case(country))
                .filter_map(|r| r.feature(feature)),
        )
    }

    /// Mean of a feature across all cities, over present values only.
    #[must_use]
    pub fn global_average(&self, feature: FeatureName) -> Option<f64> {
        mean(self.records.iter().filter_map(|r| r.feature(feature)))
    }

    /// The `limit` most populous cities of a country, descending by
    /// population.
    #[must_use]
    pub fn largest_cities(&self, country: &str, limit: usize) -> Vec<&CityRecord> {
        let mut cities: Vec<&CityRecord> = self
            .records
            .iter()
            .filter(|r| r.key.country.eq_ignore_ascii_case(country))
            .collect();
        cities.sort_by(|a, b| {
            b.population
                .cmp(&a.population)
                .then_with(|| a.key.folded().cmp(&b.key.folded()))
        });
        cities.truncate(limit);
        cities
    }

    /// Number of city records in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the catalog holds no city records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0_usize;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

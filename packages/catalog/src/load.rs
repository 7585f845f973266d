//! CSV ingestion for the feature catalog.
//!
//! Reads the raw per-city tables from a data directory and assembles
//! them into a [`FeatureCatalog`]. Monthly temperature rows are
//! pre-aggregated here into summer (Jun/Jul/Aug) and winter (Dec/Jan/Feb)
//! means; per-incident terrorism rows are rolled up into attack and
//! death counters. Malformed rows are skipped with a warning rather
//! than failing the whole load.

use std::collections::HashMap;
use std::path::Path;

use city_atlas_catalog_models::{
    CityKey, CityRecord, CityRow, CostOfLivingRow, CountryRecord, CountryRow, CrimeIndexRow,
    FeatureValues, TemperatureRow, TerrorismRow,
};
use serde::de::DeserializeOwned;

use crate::{CatalogError, FeatureCatalog};

const SUMMER_MONTHS: [u8; 3] = [6, 7, 8];
const WINTER_MONTHS: [u8; 3] = [12, 1, 2];

/// Loads a catalog from a directory of CSV tables.
///
/// `cities.csv` and `countries.csv` are required; the metric tables
/// (`cost_of_living.csv`, `crime_index.csv`, `city_temperature.csv`,
/// `terrorism.csv`) are optional and simply leave their metrics missing
/// when absent.
///
/// # Errors
///
/// Returns [`CatalogError`] if a required table cannot be read.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<FeatureCatalog, CatalogError> {
    let dir = dir.as_ref();

    let city_rows: Vec<CityRow> = read_rows(&dir.join("cities.csv"))?;
    let country_rows: Vec<CountryRow> = read_rows(&dir.join("countries.csv"))?;
    let cost_rows: Vec<CostOfLivingRow> = read_optional(&dir.join("cost_of_living.csv"))?;
    let crime_rows: Vec<CrimeIndexRow> = read_optional(&dir.join("crime_index.csv"))?;
    let temp_rows: Vec<TemperatureRow> = read_optional(&dir.join("city_temperature.csv"))?;
    let terror_rows: Vec<TerrorismRow> = read_optional(&dir.join("terrorism.csv"))?;

    let catalog = assemble(
        city_rows,
        country_rows,
        cost_rows,
        crime_rows,
        temp_rows,
        terror_rows,
    );
    log::info!(
        "Loaded catalog from {}: {} cities",
        dir.display(),
        catalog.len()
    );
    Ok(catalog)
}

/// Assembles a catalog from already-parsed rows.
#[must_use]
pub fn assemble(
    city_rows: Vec<CityRow>,
    country_rows: Vec<CountryRow>,
    cost_rows: Vec<CostOfLivingRow>,
    crime_rows: Vec<CrimeIndexRow>,
    temp_rows: Vec<TemperatureRow>,
    terror_rows: Vec<TerrorismRow>,
) -> FeatureCatalog {
    let costs: HashMap<CityKey, f64> = cost_rows
        .into_iter()
        .filter_map(|r| {
            r.cost_of_living_index
                .map(|v| (CityKey::new(r.city, r.country), v))
        })
        .collect();

    let crime: HashMap<CityKey, (Option<f64>, Option<f64>)> = crime_rows
        .into_iter()
        .map(|r| {
            (
                CityKey::new(r.city, r.country.trim().to_string()),
                (r.crime_index, r.safety_index),
            )
        })
        .collect();

    let temps = aggregate_temperatures(temp_rows);
    let terrorism = aggregate_terrorism(terror_rows);

    let records = city_rows
        .into_iter()
        .map(|row| {
            let key = CityKey::new(row.city, row.country);
            let (crime_index, safety_index) = crime.get(&key).copied().unwrap_or((None, None));
            let (avg_summer_temp, avg_winter_temp) =
                temps.get(&key).copied().unwrap_or((None, None));
            let (terrorism_attacks, terrorism_deaths) =
                terrorism.get(&key).copied().unwrap_or((0, 0));

            CityRecord {
                population: row.city_population.unwrap_or(0),
                latitude: row.city_latitude,
                longitude: row.city_longitude,
                features: FeatureValues {
                    cost_of_living_index: costs.get(&key).copied(),
                    crime_index,
                    safety_index,
                    avg_summer_temp,
                    avg_winter_temp,
                    terrorism_attacks,
                    terrorism_deaths,
                    country_population: None,
                },
                key,
            }
        })
        .collect();

    let countries = country_rows
        .into_iter()
        .map(|r| CountryRecord {
            name: r.country_name,
            population: r.population,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect();

    FeatureCatalog::from_records(records, countries)
}

/// Rolls monthly temperature rows up into per-city seasonal means.
fn aggregate_temperatures(
    rows: Vec<TemperatureRow>,
) -> HashMap<CityKey, (Option<f64>, Option<f64>)> {
    struct Acc {
        summer_sum: f64,
        summer_n: u32,
        winter_sum: f64,
        winter_n: u32,
    }

    let mut acc: HashMap<CityKey, Acc> = HashMap::new();

    for row in rows {
        let Some(temp) = row.avg_temperature else {
            continue;
        };
        let entry = acc.entry(CityKey::new(row.city, row.country)).or_insert(Acc {
            summer_sum: 0.0,
            summer_n: 0,
            winter_sum: 0.0,
            winter_n: 0,
        });
        if SUMMER_MONTHS.contains(&row.month) {
            entry.summer_sum += temp;
            entry.summer_n += 1;
        } else if WINTER_MONTHS.contains(&row.month) {
            entry.winter_sum += temp;
            entry.winter_n += 1;
        }
    }

    acc.into_iter()
        .map(|(key, a)| {
            let summer = (a.summer_n > 0).then(|| a.summer_sum / f64::from(a.summer_n));
            let winter = (a.winter_n > 0).then(|| a.winter_sum / f64::from(a.winter_n));
            (key, (summer, winter))
        })
        .collect()
}

/// Rolls per-incident terrorism rows up into `(attacks, deaths)` counters.
fn aggregate_terrorism(rows: Vec<TerrorismRow>) -> HashMap<CityKey, (u64, u64)> {
    let mut acc: HashMap<CityKey, (u64, u64)> = HashMap::new();
    for row in rows {
        let entry = acc
            .entry(CityKey::new(row.city, row.country))
            .or_insert((0, 0));
        entry.0 += 1;
        entry.1 += row.nkill.unwrap_or(0);
    }
    acc
}

/// Reads and deserializes every well-formed row of a CSV table.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let mut rows = Vec::new();
    let mut skipped = 0_usize;
    for result in reader.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                skipped += 1;
                log::warn!("Skipping malformed row in {}: {err}", path.display());
            }
        }
    }
    if skipped > 0 {
        log::warn!("Skipped {skipped} malformed rows in {}", path.display());
    }
    Ok(rows)
}

/// Like [`read_rows`], but a missing file yields an empty table.
fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    if !path.exists() {
        log::warn!("Optional table {} not found; metrics stay missing", path.display());
        return Ok(Vec::new());
    }
    read_rows(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use city_atlas_catalog_models::FeatureName;

    fn temp_row(city: &str, month: u8, temp: f64) -> TemperatureRow {
        TemperatureRow {
            city: city.to_string(),
            country: "X".to_string(),
            month,
            avg_temperature: Some(temp),
        }
    }

    #[test]
    fn temperatures_aggregate_into_seasonal_means() {
        let temps = aggregate_temperatures(vec![
            temp_row("A", 6, 20.0),
            temp_row("A", 7, 25.0),
            temp_row("A", 8, 30.0),
            temp_row("A", 12, 0.0),
            temp_row("A", 1, -5.0),
            temp_row("A", 2, -10.0),
            temp_row("A", 4, 99.0), // spring rows don't contribute
        ]);
        let (summer, winter) = temps[&CityKey::new("A", "X")];
        assert_eq!(summer, Some(25.0));
        assert_eq!(winter, Some(-5.0));
    }

    #[test]
    fn summer_only_city_has_no_winter_mean() {
        let temps = aggregate_temperatures(vec![temp_row("A", 7, 25.0)]);
        let (summer, winter) = temps[&CityKey::new("A", "X")];
        assert_eq!(summer, Some(25.0));
        assert_eq!(winter, None);
    }

    #[test]
    fn terrorism_rolls_up_attacks_and_deaths() {
        let rows = vec![
            TerrorismRow {
                city: "A".to_string(),
                country: "X".to_string(),
                nkill: Some(3),
            },
            TerrorismRow {
                city: "A".to_string(),
                country: "X".to_string(),
                nkill: None,
            },
        ];
        let agg = aggregate_terrorism(rows);
        assert_eq!(agg[&CityKey::new("A", "X")], (2, 3));
    }

    #[test]
    fn assemble_joins_metric_tables_onto_cities() {
        let catalog = assemble(
            vec![CityRow {
                city: "A".to_string(),
                country: "X".to_string(),
                city_population: Some(1000),
                city_latitude: Some(1.0),
                city_longitude: Some(2.0),
            }],
            vec![CountryRow {
                country_name: "X".to_string(),
                population: Some(9999),
                latitude: None,
                longitude: None,
            }],
            vec![CostOfLivingRow {
                city: "A".to_string(),
                country: "X".to_string(),
                cost_of_living_index: Some(42.0),
            }],
            vec![],
            vec![temp_row("A", 6, 21.0)],
            vec![],
        );

        let rec = catalog.get(&CityKey::new("A", "X")).unwrap();
        assert_eq!(rec.feature(FeatureName::CostOfLiving), Some(42.0));
        assert_eq!(rec.feature(FeatureName::SummerTemp), Some(21.0));
        assert_eq!(rec.feature(FeatureName::WinterTemp), None);
        assert_eq!(rec.feature(FeatureName::CountryPopulation), Some(9999.0));
        assert_eq!(rec.feature(FeatureName::TerrorismAttacks), Some(0.0));
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the city-atlas analytics engine.
//!
//! ```text
//! city-atlas --data-dir ./data similar Boston "United States"
//! city-atlas --data-dir ./data compare Boston "United States" Reykjavik Iceland
//! city-atlas --data-dir ./data cheapest --page 2 --page-size 10
//! city-atlas --data-dir ./data filter --max-crime-index 50 --min-summer-temp 18
//! city-atlas --data-dir ./data largest Iceland
//! ```
//!
//! Loads the CSV tables once, runs one query, and prints JSON to stdout;
//! logs go to stderr.

use std::path::PathBuf;

use city_atlas_analytics::{compare, preference, quartile, similarity};
use city_atlas_analytics_models::{
    FilterPredicate, Page, PreferenceQuery, SimilarityConfig,
};
use city_atlas_catalog_models::{CityKey, FeatureName, legacy};
use city_atlas_spatial::NeighborIndex;
use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "city-atlas", about = "City feature analytics")]
struct Cli {
    /// Directory containing the CSV tables
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Optional TOML config with engine tuning
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank all candidate cities by similarity to a query city
    Similar {
        /// Query city name
        city: String,
        /// Query country name
        country: String,
    },
    /// Export paired per-feature values for two cities
    Compare {
        /// First city name
        city1: String,
        /// First country name
        country1: String,
        /// Second city name
        city2: String,
        /// Second country name
        country2: String,
    },
    /// The cheapest quartile of cities by effective cost of living
    Cheapest {
        /// Page number (1-indexed); omit for the full set
        #[arg(long)]
        page: Option<u32>,
        /// Rows per page
        #[arg(long, default_value = "10")]
        page_size: u32,
    },
    /// Filter cities by feature ranges
    Filter {
        #[arg(long)]
        min_summer_temp: Option<f64>,
        #[arg(long)]
        max_summer_temp: Option<f64>,
        #[arg(long)]
        min_winter_temp: Option<f64>,
        #[arg(long)]
        max_winter_temp: Option<f64>,
        #[arg(long)]
        min_population: Option<f64>,
        #[arg(long)]
        max_population: Option<f64>,
        #[arg(long)]
        max_crime_index: Option<f64>,
        #[arg(long)]
        min_safety_index: Option<f64>,
        #[arg(long)]
        max_cost_of_living: Option<f64>,
        #[arg(long)]
        max_terrorism_deaths: Option<f64>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value = "10")]
        page_size: u32,
    },
    /// The most populous cities of a country
    Largest {
        /// Country name
        country: String,
        /// Number of cities to return
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Legacy city details payload (missing metrics encoded as -1)
    City {
        /// City name
        city: String,
        /// Country name
        country: String,
    },
}

/// Engine tuning loaded from the optional `--config` TOML file.
#[derive(Debug, Default, Deserialize)]
struct AtlasConfig {
    #[serde(default)]
    similarity: SimilarityConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<AtlasConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(AtlasConfig::default());
    };
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

const fn page_arg(page: Option<u32>, page_size: u32) -> Option<Page> {
    match page {
        Some(page) => Some(Page { page, page_size }),
        None => None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    log::debug!("Engine config: {:?}", config.similarity);
    let catalog = city_atlas_catalog::load::load_dir(&cli.data_dir)?;

    let output = match cli.command {
        Commands::Similar { city, country } => {
            let results = similarity::score_all(
                &catalog,
                &CityKey::new(city, country),
                &config.similarity,
            )?;
            serde_json::to_value(results)?
        }
        Commands::Compare {
            city1,
            country1,
            city2,
            country2,
        } => {
            let rows = compare::compare(
                &catalog,
                &CityKey::new(city1, country1),
                &CityKey::new(city2, country2),
            )?;
            serde_json::to_value(rows)?
        }
        Commands::Cheapest { page, page_size } => {
            let index =
                NeighborIndex::from_records(FeatureName::CostOfLiving, catalog.cities().iter());
            let results =
                quartile::select_cheapest(&catalog, &index, page_arg(page, page_size))?;
            serde_json::to_value(results)?
        }
        Commands::Filter {
            min_summer_temp,
            max_summer_temp,
            min_winter_temp,
            max_winter_temp,
            min_population,
            max_population,
            max_crime_index,
            min_safety_index,
            max_cost_of_living,
            max_terrorism_deaths,
            page,
            page_size,
        } => {
            let query = PreferenceQuery {
                predicates: vec![
                    FilterPredicate::for_feature(
                        FeatureName::SummerTemp,
                        min_summer_temp,
                        max_summer_temp,
                    ),
                    FilterPredicate::for_feature(
                        FeatureName::WinterTemp,
                        min_winter_temp,
                        max_winter_temp,
                    ),
                    FilterPredicate::for_feature(
                        FeatureName::Population,
                        min_population,
                        max_population,
                    ),
                    FilterPredicate::for_feature(FeatureName::CrimeIndex, None, max_crime_index),
                    FilterPredicate::for_feature(FeatureName::SafetyIndex, min_safety_index, None),
                    FilterPredicate::for_feature(
                        FeatureName::CostOfLiving,
                        None,
                        max_cost_of_living,
                    ),
                    FilterPredicate::for_feature(
                        FeatureName::TerrorismDeaths,
                        None,
                        max_terrorism_deaths,
                    ),
                ],
                page: page_arg(page, page_size),
            };
            let results = preference::filter(&catalog, &query)?;
            serde_json::to_value(results)?
        }
        Commands::Largest { country, limit } => {
            serde_json::to_value(catalog.largest_cities(&country, limit))?
        }
        Commands::City { city, country } => {
            let key = CityKey::new(city, country);
            let record = catalog
                .get(&key)
                .ok_or_else(|| city_atlas_analytics::AnalyticsError::city_not_found(&key))?;
            legacy::legacy_city_details(record)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory nearest-neighbor index for metric interpolation.
//!
//! Builds an R-tree over the coordinates of every city that carries a
//! given metric, and estimates the metric for cities without one from
//! their 3 nearest neighbors using inverse-squared-distance weighting.
//! Distances are great-circle (Haversine) throughout, both for neighbor
//! selection and for the interpolation weights.

use city_atlas_catalog_models::{CityKey, CityRecord, FeatureName};
use geo::{Distance, Haversine, Point};
use rstar::{RTree, primitives::GeomWithData};
use serde::{Deserialize, Serialize};

/// Exactly this many neighbors feed the interpolation.
pub const NEIGHBOR_COUNT: usize = 3;

/// How many R-tree candidates to pull before re-ranking by great-circle
/// distance. The tree orders by planar distance over raw degrees, which
/// can disagree with Haversine ordering away from the equator, so the
/// final top-3 is selected from a wider candidate pool.
const CANDIDATE_POOL: usize = 16;

/// Errors from neighbor lookup and interpolation.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// Fewer qualifying neighbors exist than the interpolation needs.
    #[error("Insufficient neighbors: needed {needed}, found {found}")]
    InsufficientNeighbors {
        /// Neighbors the interpolation requires.
        needed: usize,
        /// Neighbors actually available.
        found: usize,
    },

    /// The target city has no recorded coordinates.
    #[error("No coordinates recorded for {key}")]
    MissingCoordinates {
        /// The city that cannot be located.
        key: CityKey,
    },
}

/// A city that carries the indexed metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborSite {
    /// Identity of the neighbor city.
    pub key: CityKey,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// The metric value this site contributes.
    pub value: f64,
}

/// One neighbor used by an interpolation, with its raw distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborRef {
    /// Identity of the neighbor city.
    pub key: CityKey,
    /// Great-circle distance to the target, in kilometers.
    pub distance_km: f64,
}

/// An estimated value for a city missing the metric directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolatedValue {
    /// The city the estimate is for.
    pub key: CityKey,
    /// The metric that was estimated.
    pub feature: FeatureName,
    /// The estimated value.
    pub estimate: f64,
    /// The neighbors that produced it, nearest first.
    pub neighbors: Vec<NeighborRef>,
}

/// Precomputed nearest-neighbor index over one metric.
///
/// Built once per catalog load and shared read-only afterwards.
pub struct NeighborIndex {
    feature: FeatureName,
    tree: RTree<GeomWithData<[f64; 2], NeighborSite>>,
}

impl NeighborIndex {
    /// Builds the index from every city that carries the metric.
    #[must_use]
    pub fn build(feature: FeatureName, sites: Vec<NeighborSite>) -> Self {
        log::info!(
            "Building neighbor index for {feature} over {} sites",
            sites.len()
        );
        let entries = sites
            .into_iter()
            .map(|site| GeomWithData::new([site.longitude, site.latitude], site))
            .collect();
        Self {
            feature,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Convenience constructor pulling sites straight from city records.
    ///
    /// Only cities with both coordinates and a direct metric value are
    /// indexed.
    #[must_use]
    pub fn from_records<'a>(
        feature: FeatureName,
        records: impl Iterator<Item = &'a CityRecord>,
    ) -> Self {
        let sites = records
            .filter_map(|record| {
                let value = record.feature(feature)?;
                let latitude = record.latitude?;
                let longitude = record.longitude?;
                Some(NeighborSite {
                    key: record.key.clone(),
                    longitude,
                    latitude,
                    value,
                })
            })
            .collect();
        Self::build(feature, sites)
    }

    /// The metric this index serves.
    #[must_use]
    pub const fn feature(&self) -> FeatureName {
        self.feature
    }

    /// Number of indexed sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` when no sites are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The `k` nearest indexed sites to a point, excluding the target
    /// city itself, ordered by great-circle distance (kilometers).
    #[must_use]
    pub fn nearest(
        &self,
        longitude: f64,
        latitude: f64,
        exclude: &CityKey,
        k: usize,
    ) -> Vec<(&NeighborSite, f64)> {
        let origin = Point::new(longitude, latitude);

        let mut candidates: Vec<(&NeighborSite, f64)> = self
            .tree
            .nearest_neighbor_iter(&[longitude, latitude])
            .filter(|entry| entry.data.key != *exclude)
            .take(CANDIDATE_POOL.max(k))
            .map(|entry| {
                let site = &entry.data;
                let meters =
                    Haversine.distance(origin, Point::new(site.longitude, site.latitude));
                (site, meters / 1000.0)
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| a.0.key.folded().cmp(&b.0.key.folded()))
        });
        candidates.truncate(k);
        candidates
    }

    /// Estimates the metric for a target city from its 3 nearest
    /// neighbors, weighted by inverse squared distance.
    ///
    /// A zero-distance neighbor (identical coordinates) short-circuits
    /// the weighting and returns that neighbor's value directly.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InsufficientNeighbors`] when fewer than 3
    /// qualifying neighbors exist in the index.
    pub fn estimate(
        &self,
        target: &CityKey,
        longitude: f64,
        latitude: f64,
    ) -> Result<InterpolatedValue, SpatialError> {
        let neighbors = self.nearest(longitude, latitude, target, NEIGHBOR_COUNT);
        if neighbors.len() < NEIGHBOR_COUNT {
            return Err(SpatialError::InsufficientNeighbors {
                needed: NEIGHBOR_COUNT,
                found: neighbors.len(),
            });
        }

        let estimate = idw(&neighbors);
        log::debug!(
            "Interpolated {} for {target}: {estimate:.3} from {} neighbors",
            self.feature,
            neighbors.len()
        );

        Ok(InterpolatedValue {
            key: target.clone(),
            feature: self.feature,
            estimate,
            neighbors: neighbors
                .into_iter()
                .map(|(site, distance_km)| NeighborRef {
                    key: site.key.clone(),
                    distance_km,
                })
                .collect(),
        })
    }

    /// Estimates the metric for a catalog record.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::MissingCoordinates`] when the record has
    /// no location, or [`SpatialError::InsufficientNeighbors`] as in
    /// [`Self::estimate`].
    pub fn estimate_record(&self, record: &CityRecord) -> Result<InterpolatedValue, SpatialError> {
        let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) else {
            return Err(SpatialError::MissingCoordinates {
                key: record.key.clone(),
            });
        };
        self.estimate(&record.key, longitude, latitude)
    }
}

/// Inverse-squared-distance weighted mean over `(site, distance)` pairs.
///
/// Any zero distance returns that site's value outright; the weights
/// would otherwise divide by zero.
fn idw(neighbors: &[(&NeighborSite, f64)]) -> f64 {
    if let Some((site, _)) = neighbors.iter().find(|(_, d)| *d == 0.0) {
        return site.value;
    }

    let mut weighted = 0.0;
    let mut weights = 0.0;
    for (site, distance) in neighbors {
        let w = 1.0 / (distance * distance);
        weighted += site.value * w;
        weights += w;
    }
    weighted / weights
}

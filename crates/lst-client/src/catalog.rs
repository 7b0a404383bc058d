// Copyright 2025 the thermaview authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Site catalog and date index resolution.
//!
//! Sites are named points of interest, either from the static catalog or
//! constructed ad hoc from a map click. Each analysis session scopes its
//! queries to a bounding rectangle around the selected site, and navigates
//! a date index fetched once from the remote catalog: the distinct
//! calendar days on which an imagery product intersecting the site exists.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::engine::{ComputeEngine, DateQuery, EngineError};

/// Display name given to sites constructed from a map click.
pub const CUSTOM_SITE_NAME: &str = "Custom Location";

/// Errors raised while resolving the date index for a site.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog holds no imagery intersecting the site.
    #[error("no images found for {site}")]
    NoData { site: String },

    /// The remote engine call failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A named point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// User-facing display name.
    pub name: String,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Site {
    /// Create a named site.
    #[must_use]
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            name: name.into(),
            lon,
            lat,
        }
    }

    /// Create an ad-hoc site from a map click.
    #[must_use]
    pub fn custom(lon: f64, lat: f64) -> Self {
        Self::new(CUSTOM_SITE_NAME, lon, lat)
    }
}

lazy_static! {
    /// Static catalog of selectable sites.
    pub static ref SITES: Vec<Site> = vec![
        Site::new("Greenidge Generation", -76.943_681, 42.683_010),
        Site::new("Miliken Station", -76.636_753, 42.601_217),
        Site::new("Constellation Nuclear", -77.308_268, 43.279_134),
        Site::new("Westchester County Water Treatment", -73.910_938, 40.919_956),
    ];
}

/// Look up a catalog site by (case-insensitive) name.
#[must_use]
pub fn find_site(name: &str) -> Option<Site> {
    SITES
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .cloned()
}

/// Find the catalog site within `tolerance_deg` of a clicked point, if
/// any. Clicks elsewhere start an analysis at a custom location.
#[must_use]
pub fn site_near(lon: f64, lat: f64, tolerance_deg: f64) -> Option<Site> {
    SITES
        .iter()
        .find(|s| (s.lon - lon).abs() <= tolerance_deg && (s.lat - lat).abs() <= tolerance_deg)
        .cloned()
}

/// Bounding rectangle in degrees, used as the area of interest for all
/// per-date queries of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Derive the area of interest around a site from the configured
    /// half extents.
    #[must_use]
    pub fn around(site: &Site, config: &SessionConfig) -> Self {
        Self {
            west: site.lon - config.aoi_half_extent_lon,
            south: site.lat - config.aoi_half_extent_lat,
            east: site.lon + config.aoi_half_extent_lon,
            north: site.lat + config.aoi_half_extent_lat,
        }
    }

    /// Check whether a point falls inside the box.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

/// Fetch the ascending, deduplicated list of calendar days on which an
/// imagery product intersecting the site exists.
///
/// Dates the backend reports that do not parse as `YYYY-MM-DD` are dropped
/// with a debug log. An empty result is an error: the caller must present
/// an empty/error state rather than start navigation.
pub async fn fetch_date_list(
    engine: &dyn ComputeEngine,
    config: &SessionConfig,
    site: &Site,
) -> Result<Vec<NaiveDate>, CatalogError> {
    let query = DateQuery {
        collections: config.collections.clone(),
        lon: site.lon,
        lat: site.lat,
        start: config.date_start.clone(),
        end: config.date_end.clone(),
    };

    let raw = engine.distinct_dates(&query).await?;

    let mut dates: Vec<NaiveDate> = raw
        .iter()
        .filter_map(|s| match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                debug!("Dropping unparseable catalog date: {}", s);
                None
            }
        })
        .collect();
    dates.sort_unstable();
    dates.dedup();

    if dates.is_empty() {
        return Err(CatalogError::NoData {
            site: site.name.clone(),
        });
    }

    info!("Resolved {} distinct dates for '{}'", dates.len(), site.name);
    Ok(dates)
}

/// Resolve the index of the date nearest to `target`.
///
/// Distance is absolute time distance in days; ties resolve to the earliest
/// candidate (an ascending scan only replaces the running best on a strictly
/// smaller distance). A missing or unparseable target defaults to index 0.
#[must_use]
pub fn nearest_index(dates: &[NaiveDate], target: Option<&str>) -> usize {
    let Some(target) = target else {
        return 0;
    };
    let Ok(target) = NaiveDate::parse_from_str(target, "%Y-%m-%d") else {
        debug!("Ignoring unparseable target date: {}", target);
        return 0;
    };

    let mut best = 0;
    let mut best_distance = i64::MAX;
    for (i, date) in dates.iter().enumerate() {
        let distance = (*date - target).num_days().abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_nearest_index_basic() {
        // Greenidge example: 2023-06-20 is 3 days from 2023-06-17 and
        // 13 days from 2023-07-03.
        let dates = vec![date("2023-06-01"), date("2023-06-17"), date("2023-07-03")];
        assert_eq!(nearest_index(&dates, Some("2023-06-20")), 1);
    }

    #[test]
    fn test_nearest_index_exact_match() {
        let dates = vec![date("2023-06-01"), date("2023-06-17")];
        assert_eq!(nearest_index(&dates, Some("2023-06-17")), 1);
    }

    #[test]
    fn test_nearest_index_tie_goes_to_earlier() {
        // 2023-06-09 is 8 days from both candidates.
        let dates = vec![date("2023-06-01"), date("2023-06-17")];
        assert_eq!(nearest_index(&dates, Some("2023-06-09")), 0);
    }

    #[test]
    fn test_nearest_index_no_target_defaults_to_first() {
        let dates = vec![date("2023-06-01"), date("2023-06-17")];
        assert_eq!(nearest_index(&dates, None), 0);
    }

    #[test]
    fn test_nearest_index_invalid_target_defaults_to_first() {
        let dates = vec![date("2023-06-01"), date("2023-06-17")];
        assert_eq!(nearest_index(&dates, Some("not-a-date")), 0);
        assert_eq!(nearest_index(&dates, Some("2023-13-45")), 0);
    }

    #[test]
    fn test_nearest_index_target_outside_span() {
        let dates = vec![date("2023-06-01"), date("2023-06-17"), date("2023-07-03")];
        assert_eq!(nearest_index(&dates, Some("1999-01-01")), 0);
        assert_eq!(nearest_index(&dates, Some("2030-01-01")), 2);
    }

    #[test]
    fn test_bounding_box_half_extents() {
        let config = SessionConfig::default();
        let site = Site::new("Greenidge Generation", -76.943_681, 42.683_010);
        let bbox = BoundingBox::around(&site, &config);
        assert!((bbox.west - (-77.943_681)).abs() < 1e-9);
        assert!((bbox.south - 42.183_010).abs() < 1e-9);
        assert!((bbox.east - (-75.943_681)).abs() < 1e-9);
        assert!((bbox.north - 43.183_010).abs() < 1e-9);
        assert!(bbox.contains(site.lon, site.lat));
        assert!(!bbox.contains(0.0, 0.0));
    }

    #[test]
    fn test_find_site() {
        assert!(find_site("greenidge generation").is_some());
        assert!(find_site("Unknown Plant").is_none());
    }

    #[test]
    fn test_site_near_snaps_within_tolerance() {
        let site = site_near(-76.94, 42.68, 0.05).unwrap();
        assert_eq!(site.name, "Greenidge Generation");
        assert!(site_near(-76.94, 42.68, 0.001).is_none());
    }
}

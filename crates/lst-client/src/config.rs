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

//! Session configuration.
//!
//! Every fixed numeric constant of the analysis pipeline lives here as a
//! named, overridable field: dataset identities, area-of-interest extents,
//! reduction scales, unit conversion factors, and the fallback display
//! ranges used when statistics cannot be computed. Keeping these out of the
//! call sites makes them independently testable and lets the application
//! override them from its persisted configuration.

use serde::{Deserialize, Serialize};

use crate::engine::BandScaling;

/// Default zoom level for a freshly started analysis session.
pub const DEFAULT_SESSION_ZOOM: u8 = 14;

/// Configuration for an analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Thermal/reflectance source collections, merged at query time.
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// Land cover classification used for the permanent-water mask.
    #[serde(default = "default_landcover_collection")]
    pub landcover_collection: String,

    /// Class code for permanent water bodies in the land cover raster.
    #[serde(default = "default_water_class_code")]
    pub water_class_code: u16,

    /// Start of the catalog date span (inclusive), `YYYY-MM-DD`.
    #[serde(default = "default_date_start")]
    pub date_start: String,

    /// End of the catalog date span (inclusive), `YYYY-MM-DD`.
    #[serde(default = "default_date_end")]
    pub date_end: String,

    /// Area-of-interest half extent in degrees longitude.
    #[serde(default = "default_half_extent_lon")]
    pub aoi_half_extent_lon: f64,

    /// Area-of-interest half extent in degrees latitude.
    #[serde(default = "default_half_extent_lat")]
    pub aoi_half_extent_lat: f64,

    /// Reduction scale for thermal statistics, meters per pixel.
    #[serde(default = "default_lst_scale")]
    pub lst_scale_m: f64,

    /// Reduction scale for reflectance statistics, meters per pixel.
    #[serde(default = "default_rgb_scale")]
    pub rgb_scale_m: f64,

    /// Pixel budget for region reductions.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,

    /// Lower/upper percentiles for the thermal display range.
    #[serde(default = "default_lst_percentiles")]
    pub lst_percentiles: (f64, f64),

    /// Standard deviation multiplier for the reflectance display range.
    #[serde(default = "default_rgb_stddev_factor")]
    pub rgb_stddev_factor: f64,

    /// Reflectance bands composing the true-color layer (red, green, blue).
    #[serde(default = "default_rgb_bands")]
    pub rgb_bands: [String; 3],

    /// Raw thermal band used for the unmasked display image.
    #[serde(default = "default_thermal_band")]
    pub thermal_band: String,

    /// Fallback thermal display range in display units (used when
    /// statistics are unavailable or degenerate).
    #[serde(default = "default_fallback_lst_range")]
    pub fallback_lst_range: (f64, f64),

    /// Fallback per-channel reflectance minimum.
    #[serde(default = "default_fallback_rgb_min")]
    pub fallback_rgb_min: f64,

    /// Fallback per-channel reflectance maximum.
    #[serde(default = "default_fallback_rgb_max")]
    pub fallback_rgb_max: f64,

    /// Absolute-temperature zero point in Kelvin for the display transform.
    #[serde(default = "default_kelvin_offset")]
    pub kelvin_offset: f64,

    /// Scale factor of the Kelvin-to-display linear transform.
    #[serde(default = "default_fahrenheit_scale")]
    pub fahrenheit_scale: f64,

    /// Offset of the Kelvin-to-display linear transform.
    #[serde(default = "default_fahrenheit_offset")]
    pub fahrenheit_offset: f64,

    /// Multiplicative scale applied to raw reflectance digital numbers.
    #[serde(default = "default_reflectance_scale")]
    pub reflectance_scale: f64,

    /// Additive offset applied to raw reflectance digital numbers.
    #[serde(default = "default_reflectance_offset")]
    pub reflectance_offset: f64,

    /// Multiplicative scale converting the raw thermal band to Kelvin.
    #[serde(default = "default_thermal_band_scale")]
    pub thermal_band_scale: f64,

    /// Additive offset converting the raw thermal band to Kelvin.
    #[serde(default = "default_thermal_band_offset")]
    pub thermal_band_offset: f64,

    /// Color ramp for the thermal layer, cold to hot.
    #[serde(default = "default_lst_palette")]
    pub lst_palette: Vec<String>,

    /// Reduction scale for point inspection, meters per pixel.
    #[serde(default = "default_sample_scale")]
    pub sample_scale_m: f64,

    /// Deadline for a single engine request, seconds. A request that
    /// exceeds it degrades the navigation step instead of wedging it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Zoom level used when a restored state carries none.
    #[serde(default = "default_session_zoom")]
    pub default_zoom: u8,
}

// Default value functions for serde
fn default_collections() -> Vec<String> {
    vec![
        "LANDSAT/LC08/C02/T1_L2".to_string(),
        "LANDSAT/LC09/C02/T1_L2".to_string(),
    ]
}

fn default_landcover_collection() -> String {
    "ESA/WorldCover/v200".to_string()
}

fn default_water_class_code() -> u16 {
    80
}

fn default_date_start() -> String {
    "2000-01-01".to_string()
}

fn default_date_end() -> String {
    "2026-12-31".to_string()
}

fn default_half_extent_lon() -> f64 {
    1.0
}

fn default_half_extent_lat() -> f64 {
    0.5
}

fn default_lst_scale() -> f64 {
    90.0
}

fn default_rgb_scale() -> f64 {
    30.0
}

fn default_max_pixels() -> u64 {
    1_000_000_000
}

fn default_lst_percentiles() -> (f64, f64) {
    (1.0, 99.0)
}

fn default_rgb_stddev_factor() -> f64 {
    2.0
}

fn default_rgb_bands() -> [String; 3] {
    [
        "SR_B4".to_string(),
        "SR_B3".to_string(),
        "SR_B2".to_string(),
    ]
}

fn default_thermal_band() -> String {
    "ST_B10".to_string()
}

fn default_fallback_lst_range() -> (f64, f64) {
    (50.0, 90.0)
}

fn default_fallback_rgb_min() -> f64 {
    -0.1
}

fn default_fallback_rgb_max() -> f64 {
    0.3
}

fn default_kelvin_offset() -> f64 {
    273.15
}

fn default_fahrenheit_scale() -> f64 {
    1.8
}

fn default_fahrenheit_offset() -> f64 {
    32.0
}

fn default_reflectance_scale() -> f64 {
    0.000_027_5
}

fn default_reflectance_offset() -> f64 {
    -0.2
}

fn default_thermal_band_scale() -> f64 {
    0.003_418_02
}

fn default_thermal_band_offset() -> f64 {
    149.0
}

fn default_lst_palette() -> Vec<String> {
    ["blue", "cyan", "green", "yellow", "red"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_sample_scale() -> f64 {
    90.0
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_session_zoom() -> u8 {
    DEFAULT_SESSION_ZOOM
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            collections: default_collections(),
            landcover_collection: default_landcover_collection(),
            water_class_code: default_water_class_code(),
            date_start: default_date_start(),
            date_end: default_date_end(),
            aoi_half_extent_lon: default_half_extent_lon(),
            aoi_half_extent_lat: default_half_extent_lat(),
            lst_scale_m: default_lst_scale(),
            rgb_scale_m: default_rgb_scale(),
            max_pixels: default_max_pixels(),
            lst_percentiles: default_lst_percentiles(),
            rgb_stddev_factor: default_rgb_stddev_factor(),
            rgb_bands: default_rgb_bands(),
            thermal_band: default_thermal_band(),
            fallback_lst_range: default_fallback_lst_range(),
            fallback_rgb_min: default_fallback_rgb_min(),
            fallback_rgb_max: default_fallback_rgb_max(),
            kelvin_offset: default_kelvin_offset(),
            fahrenheit_scale: default_fahrenheit_scale(),
            fahrenheit_offset: default_fahrenheit_offset(),
            reflectance_scale: default_reflectance_scale(),
            reflectance_offset: default_reflectance_offset(),
            thermal_band_scale: default_thermal_band_scale(),
            thermal_band_offset: default_thermal_band_offset(),
            lst_palette: default_lst_palette(),
            sample_scale_m: default_sample_scale(),
            request_timeout_secs: default_request_timeout_secs(),
            default_zoom: default_session_zoom(),
        }
    }
}

impl SessionConfig {
    /// Rescaling from raw reflectance digital numbers to reflectance.
    #[must_use]
    pub fn reflectance_scaling(&self) -> BandScaling {
        BandScaling {
            scale: self.reflectance_scale,
            offset: self.reflectance_offset,
        }
    }

    /// Rescaling from raw thermal counts to Kelvin.
    #[must_use]
    pub fn thermal_scaling(&self) -> BandScaling {
        BandScaling {
            scale: self.thermal_band_scale,
            offset: self.thermal_band_offset,
        }
    }

    /// Rescaling from Kelvin to display units, the Kelvin-to-Fahrenheit
    /// conversion folded into a single linear transform.
    #[must_use]
    pub fn display_transform(&self) -> BandScaling {
        BandScaling {
            scale: self.fahrenheit_scale,
            offset: self.fahrenheit_offset - self.kelvin_offset * self.fahrenheit_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelvin_conversion_round_figures() {
        let transform = SessionConfig::default().display_transform();
        // Freezing point of water
        assert!((transform.apply(273.15) - 32.0).abs() < 1e-9);
        // Boiling point of water
        assert!((transform.apply(373.15) - 212.0).abs() < 1e-9);
    }

    #[test]
    fn test_band_scalings_match_raw_calibration() {
        let config = SessionConfig::default();
        // A raw thermal count of zero is the additive calibration offset.
        assert!((config.thermal_scaling().apply(0.0) - 149.0).abs() < 1e-12);
        // Raw reflectance digital numbers rescale into unit reflectance.
        let mid = config.reflectance_scaling().apply(10_000.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_defaults_are_well_formed() {
        let config = SessionConfig::default();
        assert_eq!(config.collections.len(), 2);
        assert!(config.fallback_lst_range.0 < config.fallback_lst_range.1);
        assert!(config.fallback_rgb_min < config.fallback_rgb_max);
        assert_eq!(config.lst_palette.len(), 5);
    }
}

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

//! Remote compute engine abstraction.
//!
//! The imagery catalog and its query/reduction capabilities live behind the
//! [`ComputeEngine`] trait: distinct-date extraction, batched per-region
//! statistical reduction, and point sampling. Two implementations ship with
//! the crate: an HTTP client for a real backend and a scripted in-memory
//! engine for tests and offline use.

pub mod http;
pub mod scripted;

pub use http::HttpEngine;
pub use scripted::ScriptedEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::BoundingBox;

/// Errors raised by compute engine calls.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transport-level failure reaching the backend.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered but reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// The request exceeded the configured deadline.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),
}

/// Query for the distinct calendar days with imagery intersecting a point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateQuery {
    /// Source collections, merged before filtering.
    pub collections: Vec<String>,
    /// Point of interest longitude, degrees.
    pub lon: f64,
    /// Point of interest latitude, degrees.
    pub lat: f64,
    /// Span start, `YYYY-MM-DD` inclusive.
    pub start: String,
    /// Span end, `YYYY-MM-DD` inclusive.
    pub end: String,
}

/// Linear rescaling `value * scale + offset` applied to a band.
///
/// Carried on the wire so the backend never has to hard-code dataset
/// calibration: raw digital numbers to reflectance, raw thermal counts to
/// Kelvin, and Kelvin to display units are all instances of this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandScaling {
    pub scale: f64,
    pub offset: f64,
}

impl BandScaling {
    /// Apply the rescaling to one value.
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

/// Batched statistics request for one displayed date.
///
/// A single request covers both statistic sets so each navigation step
/// costs exactly one round trip. The dataset identities and calibration
/// travel with the request; the backend applies them rather than assuming
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRequest {
    /// Displayed calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Area of interest for both reductions.
    pub bounds: BoundingBox,
    /// Thermal reduction scale, meters per pixel.
    pub lst_scale_m: f64,
    /// Reflectance reduction scale, meters per pixel.
    pub rgb_scale_m: f64,
    /// Lower/upper percentiles for the thermal range.
    pub lst_percentiles: (f64, f64),
    /// Reflectance bands to reduce (red, green, blue).
    pub rgb_bands: [String; 3],
    /// Rescaling from raw reflectance digital numbers.
    pub reflectance_scaling: BandScaling,
    /// Raw thermal band reduced for the percentile range.
    pub thermal_band: String,
    /// Rescaling from raw thermal counts to Kelvin.
    pub thermal_scaling: BandScaling,
    /// Rescaling from Kelvin to display units; the percentile bounds come
    /// back already converted.
    pub display_transform: BandScaling,
    /// Land cover classification supplying the water mask.
    pub landcover_collection: String,
    /// Land cover class code excluded from the thermal reduction.
    pub water_class_code: u16,
    /// Pixel budget for the reductions.
    pub max_pixels: u64,
}

/// Thermal percentile bounds in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LstPercentiles {
    /// Lower percentile value.
    pub lo: f64,
    /// Upper percentile value.
    pub hi: f64,
}

/// Per-channel median and standard deviation of the reflectance bands,
/// in request band order (red, green, blue).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbBandStats {
    pub median: [f64; 3],
    pub std_dev: [f64; 3],
}

/// Result of a batched statistics request.
///
/// Either set may be absent when the backend could not reduce it (a fully
/// obscured scene, for instance). Absence is not an error: the caller
/// substitutes fallback display ranges per set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneStats {
    /// Thermal percentile bounds over the land-masked thermal band.
    pub lst: Option<LstPercentiles>,
    /// Reflectance statistics over the full (unmasked) area of interest.
    pub rgb: Option<RgbBandStats>,
}

/// Point sampling request against the thermal product of one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRequest {
    /// Displayed calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Sample longitude, degrees.
    pub lon: f64,
    /// Sample latitude, degrees.
    pub lat: f64,
    /// Sampling scale, meters per pixel.
    pub scale_m: f64,
    /// Raw thermal band to sample.
    pub thermal_band: String,
    /// Rescaling from raw thermal counts to Kelvin.
    pub thermal_scaling: BandScaling,
    /// Rescaling from Kelvin to display units applied to the sampled value.
    pub display_transform: BandScaling,
}

/// Capability surface of the remote imagery catalog and reduction engine.
///
/// All calls are asynchronous; callers are responsible for sequencing and
/// for discarding superseded results.
#[async_trait]
pub trait ComputeEngine: Send + Sync {
    /// Distinct calendar days with an imagery product intersecting the
    /// query point, in no guaranteed order.
    async fn distinct_dates(&self, query: &DateQuery) -> Result<Vec<String>, EngineError>;

    /// Both statistic sets for one displayed date, in a single round trip.
    async fn scene_statistics(&self, request: &StatsRequest) -> Result<SceneStats, EngineError>;

    /// First thermal value at a point, in display units. `None` when the
    /// product has no data at that location.
    async fn sample_lst(&self, request: &SampleRequest) -> Result<Option<f64>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_request_wire_shape() {
        let request = StatsRequest {
            date: "2023-06-17".to_string(),
            bounds: BoundingBox {
                west: -77.9,
                south: 42.2,
                east: -75.9,
                north: 43.2,
            },
            lst_scale_m: 90.0,
            rgb_scale_m: 30.0,
            lst_percentiles: (1.0, 99.0),
            rgb_bands: ["SR_B4".into(), "SR_B3".into(), "SR_B2".into()],
            reflectance_scaling: BandScaling {
                scale: 0.000_027_5,
                offset: -0.2,
            },
            thermal_band: "ST_B10".to_string(),
            thermal_scaling: BandScaling {
                scale: 0.003_418_02,
                offset: 149.0,
            },
            display_transform: BandScaling {
                scale: 1.8,
                offset: -459.67,
            },
            landcover_collection: "ESA/WorldCover/v200".to_string(),
            water_class_code: 80,
            max_pixels: 1_000_000_000,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["date"], "2023-06-17");
        assert_eq!(value["bounds"]["west"], -77.9);
        assert_eq!(value["rgb_bands"][0], "SR_B4");
        assert_eq!(value["thermal_band"], "ST_B10");
        assert_eq!(value["thermal_scaling"]["offset"], 149.0);
        assert_eq!(value["landcover_collection"], "ESA/WorldCover/v200");
        assert_eq!(value["water_class_code"], 80);
    }

    #[test]
    fn test_band_scaling_is_linear() {
        let to_kelvin = BandScaling {
            scale: 0.003_418_02,
            offset: 149.0,
        };
        assert!((to_kelvin.apply(0.0) - 149.0).abs() < 1e-12);

        let to_fahrenheit = BandScaling {
            scale: 1.8,
            offset: -459.67,
        };
        assert!((to_fahrenheit.apply(273.15) - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_scene_stats_absent_sets_deserialize() {
        // A backend that could not reduce either set sends explicit nulls.
        let stats: SceneStats =
            serde_json::from_str(r#"{"lst": null, "rgb": null}"#).unwrap();
        assert_eq!(stats, SceneStats::default());

        let stats: SceneStats =
            serde_json::from_str(r#"{"lst": {"lo": 55.0, "hi": 92.0}, "rgb": null}"#).unwrap();
        assert_eq!(stats.lst, Some(LstPercentiles { lo: 55.0, hi: 92.0 }));
        assert!(stats.rgb.is_none());
    }
}

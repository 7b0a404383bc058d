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

//! Data-driven visualization ranges.
//!
//! Turns the server-side statistics of a displayed scene into display
//! ranges: the thermal layer stretches between its 1st and 99th land
//! percentile, the true-color layer between median ± 2σ per channel.
//! Either statistic set may be missing or degenerate, in which case the
//! fixed fallback range from the session configuration is substituted for
//! that set alone, so the display always renders something plausible.

use crate::config::SessionConfig;
use crate::engine::SceneStats;

/// Thermal display range in display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LstRange {
    pub min: f64,
    pub max: f64,
}

impl LstRange {
    /// A range is usable when both bounds are finite and ordered.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    /// Midpoint of the range (the legend's center label).
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Per-channel reflectance display range (red, green, blue).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbRange {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl RgbRange {
    /// Every channel must be finite and ordered.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min
            .iter()
            .zip(self.max.iter())
            .all(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo < hi)
    }
}

/// Derived display ranges for one navigation step, with per-set fallback
/// flags so the caller can surface a diagnostic notice exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VizRanges {
    pub lst: LstRange,
    pub rgb: RgbRange,
    /// The thermal range came from the fallback constants.
    pub lst_is_fallback: bool,
    /// The reflectance range came from the fallback constants.
    pub rgb_is_fallback: bool,
}

/// The fallback thermal range from configuration.
#[must_use]
pub fn fallback_lst_range(config: &SessionConfig) -> LstRange {
    LstRange {
        min: config.fallback_lst_range.0,
        max: config.fallback_lst_range.1,
    }
}

/// The fallback reflectance range from configuration.
#[must_use]
pub fn fallback_rgb_range(config: &SessionConfig) -> RgbRange {
    RgbRange {
        min: [config.fallback_rgb_min; 3],
        max: [config.fallback_rgb_max; 3],
    }
}

/// Derive display ranges from scene statistics, applying the fallback
/// policy per statistic set independently. Degenerate computed ranges
/// (non-finite or inverted bounds) also fall back rather than rendering
/// degenerate output.
#[must_use]
pub fn derive_ranges(stats: &SceneStats, config: &SessionConfig) -> VizRanges {
    let (lst, lst_is_fallback) = match stats.lst {
        Some(p) => {
            let range = LstRange { min: p.lo, max: p.hi };
            if range.is_valid() {
                (range, false)
            } else {
                (fallback_lst_range(config), true)
            }
        }
        None => (fallback_lst_range(config), true),
    };

    let (rgb, rgb_is_fallback) = match stats.rgb {
        Some(s) => {
            let k = config.rgb_stddev_factor;
            let mut min = [0.0; 3];
            let mut max = [0.0; 3];
            for channel in 0..3 {
                min[channel] = s.median[channel] - k * s.std_dev[channel];
                max[channel] = s.median[channel] + k * s.std_dev[channel];
            }
            let range = RgbRange { min, max };
            if range.is_valid() {
                (range, false)
            } else {
                (fallback_rgb_range(config), true)
            }
        }
        None => (fallback_rgb_range(config), true),
    };

    VizRanges {
        lst,
        rgb,
        lst_is_fallback,
        rgb_is_fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LstPercentiles, RgbBandStats};

    #[test]
    fn test_derive_from_complete_statistics() {
        let config = SessionConfig::default();
        let stats = SceneStats {
            lst: Some(LstPercentiles { lo: 55.0, hi: 92.0 }),
            rgb: Some(RgbBandStats {
                median: [0.12, 0.10, 0.08],
                std_dev: [0.04, 0.03, 0.02],
            }),
        };

        let ranges = derive_ranges(&stats, &config);
        assert!(!ranges.lst_is_fallback);
        assert!(!ranges.rgb_is_fallback);
        assert_eq!(ranges.lst, LstRange { min: 55.0, max: 92.0 });
        assert!((ranges.rgb.min[0] - 0.04).abs() < 1e-12);
        assert!((ranges.rgb.max[0] - 0.20).abs() < 1e-12);
        assert!((ranges.rgb.min[2] - 0.04).abs() < 1e-12);
        assert!((ranges.rgb.max[2] - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_missing_lst_falls_back_independently() {
        let config = SessionConfig::default();
        let stats = SceneStats {
            lst: None,
            rgb: Some(RgbBandStats {
                median: [0.1; 3],
                std_dev: [0.02; 3],
            }),
        };

        let ranges = derive_ranges(&stats, &config);
        assert!(ranges.lst_is_fallback);
        assert!(!ranges.rgb_is_fallback);
        assert_eq!(ranges.lst, fallback_lst_range(&config));
    }

    #[test]
    fn test_fully_obscured_scene_uses_both_fallbacks() {
        let config = SessionConfig::default();
        let ranges = derive_ranges(&SceneStats::default(), &config);

        assert!(ranges.lst_is_fallback);
        assert!(ranges.rgb_is_fallback);
        assert_eq!(ranges.lst, LstRange { min: 50.0, max: 90.0 });
        assert_eq!(ranges.rgb.min, [-0.1; 3]);
        assert_eq!(ranges.rgb.max, [0.3; 3]);
        // Never NaN, never inverted.
        assert!(ranges.lst.is_valid());
        assert!(ranges.rgb.is_valid());
    }

    #[test]
    fn test_degenerate_statistics_force_fallback() {
        let config = SessionConfig::default();

        // Inverted percentiles.
        let inverted = SceneStats {
            lst: Some(LstPercentiles { lo: 90.0, hi: 50.0 }),
            rgb: None,
        };
        assert!(derive_ranges(&inverted, &config).lst_is_fallback);

        // NaN from the backend.
        let nan = SceneStats {
            lst: Some(LstPercentiles {
                lo: f64::NAN,
                hi: 80.0,
            }),
            rgb: Some(RgbBandStats {
                median: [0.1, f64::NAN, 0.1],
                std_dev: [0.0, 0.0, 0.0],
            }),
        };
        let ranges = derive_ranges(&nan, &config);
        assert!(ranges.lst_is_fallback);
        // Zero deviation makes min == max, which is degenerate too.
        assert!(ranges.rgb_is_fallback);
        assert!(ranges.lst.is_valid() && ranges.rgb.is_valid());
    }

    #[test]
    fn test_range_midpoint() {
        let range = LstRange { min: 50.0, max: 90.0 };
        assert!((range.mid() - 70.0).abs() < 1e-12);
    }
}

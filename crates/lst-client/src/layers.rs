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

//! Layer composition.
//!
//! Each navigation step produces one fixed-order layer stack: true-color
//! reflectance below the thermal layer, below the land mask, below the site
//! markers. The stack is replaced whole, never patched, so the visible set
//! is always internally consistent. Layers carry typed kind tags; nothing
//! addresses a layer by position.

use chrono::NaiveDate;

use crate::config::SessionConfig;
use crate::viz::{LstRange, VizRanges};

/// Stable identity of a composed layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// True-color reflectance composite.
    Rgb,
    /// Surface temperature color ramp.
    Lst,
    /// Opaque land mask (water left visible).
    LandMask,
    /// Static selectable site markers.
    SiteMarkers,
}

/// Reference to a renderable image, resolved by the map shell against the
/// configured collections.
///
/// The thermal display image and the statistics source are deliberately
/// different products: display uses the unmasked surface temperature so
/// water pixels still render, statistics use the land-masked retrieval
/// product so water does not skew the range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Scaled true-color composite for one date.
    Reflectance { date: NaiveDate },
    /// Unmasked surface temperature in display units, resampled bicubic
    /// for visual continuity.
    SurfaceTemperature { date: NaiveDate },
    /// Cloud-masked thermal retrieval product for one date; the source for
    /// statistics and point inspection.
    LstProduct { date: NaiveDate },
    /// Land pixels of the land cover classification (water excluded).
    LandMask,
    /// The static site catalog.
    SiteMarkers,
}

/// Display parameters attached to a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum VizParams {
    /// Color ramp stretch for the thermal layer.
    Lst {
        min: f64,
        max: f64,
        palette: Vec<String>,
    },
    /// Per-channel stretch for the true-color layer.
    Rgb { min: [f64; 3], max: [f64; 3] },
    /// Single flat color (mask and marker layers).
    Color { color: String },
}

/// One composed layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub kind: LayerKind,
    /// Display name shown by the layer list.
    pub name: &'static str,
    pub image: ImageRef,
    pub viz: VizParams,
}

/// The ordered, atomically replaced layer set of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    /// Compose the full stack for one displayed date. Order is fixed:
    /// RGB, LST, land mask, site markers.
    #[must_use]
    pub fn compose(date: NaiveDate, ranges: &VizRanges, config: &SessionConfig) -> Self {
        let layers = vec![
            Layer {
                kind: LayerKind::Rgb,
                name: "RGB",
                image: ImageRef::Reflectance { date },
                viz: VizParams::Rgb {
                    min: ranges.rgb.min,
                    max: ranges.rgb.max,
                },
            },
            Layer {
                kind: LayerKind::Lst,
                name: "LST",
                image: ImageRef::SurfaceTemperature { date },
                viz: VizParams::Lst {
                    min: ranges.lst.min,
                    max: ranges.lst.max,
                    palette: config.lst_palette.clone(),
                },
            },
            Layer {
                kind: LayerKind::LandMask,
                name: "Land Mask",
                image: ImageRef::LandMask,
                viz: VizParams::Color {
                    color: "000000".to_string(),
                },
            },
            Layer {
                kind: LayerKind::SiteMarkers,
                name: "Selectable Sites",
                image: ImageRef::SiteMarkers,
                viz: VizParams::Color {
                    color: "red".to_string(),
                },
            },
        ];
        Self { layers }
    }

    /// The empty stack (no active session).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Iterate layers bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Find a layer by its kind tag.
    #[must_use]
    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    /// Re-stretch the thermal layer in place. This is the legend's pure
    /// recolor path; no data is re-fetched. Returns false when there is no
    /// thermal layer to update.
    pub fn set_lst_range(&mut self, range: LstRange) -> bool {
        for layer in &mut self.layers {
            if layer.kind == LayerKind::Lst {
                if let VizParams::Lst { min, max, .. } = &mut layer.viz {
                    *min = range.min;
                    *max = range.max;
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::{derive_ranges, RgbRange};
    use crate::engine::SceneStats;

    fn stack() -> (LayerStack, VizRanges) {
        let config = SessionConfig::default();
        let date = NaiveDate::from_ymd_opt(2023, 6, 17).unwrap();
        let ranges = derive_ranges(&SceneStats::default(), &config);
        (LayerStack::compose(date, &ranges, &config), ranges)
    }

    #[test]
    fn test_fixed_layer_order() {
        let (stack, _) = stack();
        let kinds: Vec<LayerKind> = stack.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LayerKind::Rgb,
                LayerKind::Lst,
                LayerKind::LandMask,
                LayerKind::SiteMarkers
            ]
        );
    }

    #[test]
    fn test_display_uses_unmasked_thermal_image() {
        let (stack, _) = stack();
        let lst = stack.layer(LayerKind::Lst).unwrap();
        assert!(matches!(lst.image, ImageRef::SurfaceTemperature { .. }));
    }

    #[test]
    fn test_set_lst_range_in_place() {
        let (mut stack, _) = stack();
        assert!(stack.set_lst_range(LstRange { min: 60.0, max: 80.0 }));

        match &stack.layer(LayerKind::Lst).unwrap().viz {
            VizParams::Lst { min, max, palette } => {
                assert_eq!((*min, *max), (60.0, 80.0));
                // Recolor keeps the palette.
                assert_eq!(palette.len(), 5);
            }
            other => panic!("unexpected viz params: {:?}", other),
        }
    }

    #[test]
    fn test_set_lst_range_on_empty_stack() {
        let mut stack = LayerStack::empty();
        assert!(!stack.set_lst_range(LstRange { min: 0.0, max: 1.0 }));
    }

    #[test]
    fn test_rgb_stretch_carried_per_channel() {
        let config = SessionConfig::default();
        let date = NaiveDate::from_ymd_opt(2023, 6, 17).unwrap();
        let ranges = VizRanges {
            lst: LstRange { min: 50.0, max: 90.0 },
            rgb: RgbRange {
                min: [0.01, 0.02, 0.03],
                max: [0.2, 0.3, 0.4],
            },
            lst_is_fallback: false,
            rgb_is_fallback: false,
        };
        let stack = LayerStack::compose(date, &ranges, &config);
        match &stack.layer(LayerKind::Rgb).unwrap().viz {
            VizParams::Rgb { min, max } => {
                assert_eq!(*min, [0.01, 0.02, 0.03]);
                assert_eq!(*max, [0.2, 0.3, 0.4]);
            }
            other => panic!("unexpected viz params: {:?}", other),
        }
    }
}

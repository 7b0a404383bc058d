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

//! Legend range editing.
//!
//! The legend exposes min/max text fields seeded from the computed thermal
//! range. A valid edit (both fields parse, min strictly below max)
//! immediately yields a new applied range for the thermal layer; invalid or
//! inverted input is ignored without surfacing an error, keeping the prior
//! valid range.

use crate::viz::LstRange;

/// Editable legend state for the thermal layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    min_text: String,
    max_text: String,
    applied: LstRange,
}

impl Legend {
    /// Seed the legend from a computed range.
    #[must_use]
    pub fn seeded(range: LstRange) -> Self {
        Self {
            min_text: format!("{:.2}", range.min),
            max_text: format!("{:.2}", range.max),
            applied: range,
        }
    }

    /// The currently applied range.
    #[must_use]
    pub fn applied(&self) -> LstRange {
        self.applied
    }

    /// Current min field text.
    #[must_use]
    pub fn min_text(&self) -> &str {
        &self.min_text
    }

    /// Current max field text.
    #[must_use]
    pub fn max_text(&self) -> &str {
        &self.max_text
    }

    /// Center label between the applied bounds.
    #[must_use]
    pub fn mid_label(&self) -> String {
        format!("{:.2}", self.applied.mid())
    }

    /// Apply a manual edit. Returns the new range when both values parse
    /// as finite numbers with `min < max`; otherwise returns `None` and
    /// leaves the applied range untouched.
    pub fn edit(&mut self, min_text: &str, max_text: &str) -> Option<LstRange> {
        let min = min_text.trim().parse::<f64>().ok()?;
        let max = max_text.trim().parse::<f64>().ok()?;

        let range = LstRange { min, max };
        if !range.is_valid() {
            return None;
        }

        self.min_text = min_text.trim().to_string();
        self.max_text = max_text.trim().to_string();
        self.applied = range;
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_from_range() {
        let legend = Legend::seeded(LstRange { min: 50.0, max: 90.0 });
        assert_eq!(legend.min_text(), "50.00");
        assert_eq!(legend.max_text(), "90.00");
        assert_eq!(legend.mid_label(), "70.00");
    }

    #[test]
    fn test_valid_edit_applies_exactly() {
        let mut legend = Legend::seeded(LstRange { min: 50.0, max: 90.0 });
        let range = legend.edit("62.5", "81.25").unwrap();
        assert_eq!(range, LstRange { min: 62.5, max: 81.25 });
        assert_eq!(legend.applied(), range);
        assert_eq!(legend.mid_label(), "71.88");
    }

    #[test]
    fn test_inverted_edit_ignored() {
        let mut legend = Legend::seeded(LstRange { min: 50.0, max: 90.0 });
        assert!(legend.edit("90", "50").is_none());
        assert!(legend.edit("70", "70").is_none());
        assert_eq!(legend.applied(), LstRange { min: 50.0, max: 90.0 });
    }

    #[test]
    fn test_non_numeric_edit_ignored() {
        let mut legend = Legend::seeded(LstRange { min: 50.0, max: 90.0 });
        assert!(legend.edit("warm", "90").is_none());
        assert!(legend.edit("50", "").is_none());
        assert!(legend.edit("NaN", "90").is_none());
        assert_eq!(legend.applied(), LstRange { min: 50.0, max: 90.0 });
        assert_eq!(legend.min_text(), "50.00");
    }
}

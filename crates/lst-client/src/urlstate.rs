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

//! Persisted navigation state.
//!
//! Four string keys, `latitude`, `longitude`, `zoom` and `date`, mirror the
//! live session in a key-value store, making every navigation state
//! deep-linkable and reload-stable. The viewport writes back center and
//! zoom when it goes idle, each navigation step writes the displayed date,
//! and reset clears all four. On startup, a state whose latitude and
//! longitude parse as valid numbers reconstructs a session; anything else
//! means "no active session" regardless of the remaining keys.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

pub const KEY_LATITUDE: &str = "latitude";
pub const KEY_LONGITUDE: &str = "longitude";
pub const KEY_ZOOM: &str = "zoom";
pub const KEY_DATE: &str = "date";

/// Key-value persistence surface for navigation state. Values are
/// human-readable decimal text; an absent key means "unset".
pub trait StateStore: Send + fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory store, also the deep-link codec's working form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Snapshot of the four persisted keys, raw and unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavState {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub zoom: Option<String>,
    pub date: Option<String>,
}

impl NavState {
    /// Read all four keys from a store.
    #[must_use]
    pub fn read(store: &dyn StateStore) -> Self {
        Self {
            latitude: store.get(KEY_LATITUDE),
            longitude: store.get(KEY_LONGITUDE),
            zoom: store.get(KEY_ZOOM),
            date: store.get(KEY_DATE),
        }
    }

    /// Parse a deep-link query string (`latitude=..&longitude=..&...`).
    /// Unknown keys are ignored.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut state = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            match key {
                KEY_LATITUDE => state.latitude = Some(value.to_string()),
                KEY_LONGITUDE => state.longitude = Some(value.to_string()),
                KEY_ZOOM => state.zoom = Some(value.to_string()),
                KEY_DATE => state.date = Some(value.to_string()),
                _ => {}
            }
        }
        state
    }

    /// Render the set keys as a deep-link query string.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();
        for (key, value) in [
            (KEY_LATITUDE, &self.latitude),
            (KEY_LONGITUDE, &self.longitude),
            (KEY_ZOOM, &self.zoom),
            (KEY_DATE, &self.date),
        ] {
            if let Some(value) = value {
                parts.push(format!("{}={}", key, value));
            }
        }
        parts.join("&")
    }

    /// The session anchor, if both coordinates parse as valid numbers.
    /// Returns `(latitude, longitude)`. Absence or a parse failure means
    /// no session is restored, whatever the other keys hold.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.as_deref()?.trim().parse::<f64>().ok()?;
        let lon = self.longitude.as_deref()?.trim().parse::<f64>().ok()?;
        if lat.is_finite() && lon.is_finite() {
            Some((lat, lon))
        } else {
            None
        }
    }

    /// The persisted zoom level, when it parses.
    #[must_use]
    pub fn zoom_level(&self) -> Option<u8> {
        self.zoom.as_deref()?.trim().parse::<u8>().ok()
    }

    /// The persisted target date string, if any.
    #[must_use]
    pub fn target_date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    /// Copy the set keys into a store.
    pub fn write(&self, store: &mut dyn StateStore) {
        for (key, value) in [
            (KEY_LATITUDE, &self.latitude),
            (KEY_LONGITUDE, &self.longitude),
            (KEY_ZOOM, &self.zoom),
            (KEY_DATE, &self.date),
        ] {
            match value {
                Some(value) => store.set(key, value),
                None => store.remove(key),
            }
        }
    }
}

/// Write back the viewport center and zoom (viewport-idle hook).
pub fn write_viewport(store: &mut dyn StateStore, lat: f64, lon: f64, zoom: u8) {
    store.set(KEY_LATITUDE, &format!("{:.6}", lat));
    store.set(KEY_LONGITUDE, &format!("{:.6}", lon));
    store.set(KEY_ZOOM, &zoom.to_string());
}

/// Write back the displayed date (navigation-step hook).
pub fn write_date(store: &mut dyn StateStore, date: NaiveDate) {
    store.set(KEY_DATE, &date.format("%Y-%m-%d").to_string());
}

/// Clear all four keys (session reset).
pub fn clear(store: &mut dyn StateStore) {
    store.remove(KEY_LATITUDE);
    store.remove(KEY_LONGITUDE);
    store.remove(KEY_ZOOM);
    store.remove(KEY_DATE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_round_trip() {
        let state = NavState::from_query("latitude=42.683010&longitude=-76.943681&zoom=14&date=2023-06-17");
        assert_eq!(state.coordinates(), Some((42.683_010, -76.943_681)));
        assert_eq!(state.zoom_level(), Some(14));
        assert_eq!(state.target_date(), Some("2023-06-17"));
        assert_eq!(
            state.to_query(),
            "latitude=42.683010&longitude=-76.943681&zoom=14&date=2023-06-17"
        );
    }

    #[test]
    fn test_missing_coordinates_mean_no_session() {
        let state = NavState::from_query("zoom=14&date=2023-06-17");
        assert_eq!(state.coordinates(), None);

        // One coordinate alone is not enough either.
        let state = NavState::from_query("latitude=42.68&zoom=14");
        assert_eq!(state.coordinates(), None);
    }

    #[test]
    fn test_unparseable_coordinates_mean_no_session() {
        let state = NavState::from_query("latitude=north&longitude=-76.9");
        assert_eq!(state.coordinates(), None);
        // The other keys are still readable, they just do not matter.
        assert_eq!(state.zoom_level(), None);
    }

    #[test]
    fn test_unknown_and_empty_keys_ignored() {
        let state = NavState::from_query("?latitude=1.5&longitude=2.5&theme=dark&date=");
        assert_eq!(state.coordinates(), Some((1.5, 2.5)));
        assert_eq!(state.target_date(), None);
    }

    #[test]
    fn test_store_write_and_clear() {
        let mut store = MemoryStore::new();
        write_viewport(&mut store, 42.683_010_4, -76.943_681, 14);
        write_date(
            &mut store,
            NaiveDate::from_ymd_opt(2023, 6, 17).unwrap(),
        );

        let state = NavState::read(&store);
        assert_eq!(state.latitude.as_deref(), Some("42.683010"));
        assert_eq!(state.longitude.as_deref(), Some("-76.943681"));
        assert_eq!(state.zoom_level(), Some(14));
        assert_eq!(state.target_date(), Some("2023-06-17"));

        clear(&mut store);
        assert_eq!(NavState::read(&store), NavState::default());
    }
}

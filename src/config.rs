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

//! Application configuration management.
//!
//! Persistent configuration stored in TOML format. Holds the compute
//! engine endpoint and the session overrides a user is likely to pin
//! (default zoom, request deadline, fallback thermal range); everything
//! else keeps the library defaults.

use lst_client::SessionConfig;
use serde::{Deserialize, Serialize};

/// Default compute engine endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8017";

const APP_NAME: &str = "thermaview";
const CONFIG_NAME: &str = "config";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Compute engine base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Default map zoom level for new sessions
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    /// Deadline for a single engine request, seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fallback thermal display range (min, max) in display units
    #[serde(default = "default_fallback_lst_range")]
    pub fallback_lst_range: (f64, f64),
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_zoom() -> u8 {
    lst_client::config::DEFAULT_SESSION_ZOOM
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fallback_lst_range() -> (f64, f64) {
    (50.0, 90.0)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            endpoint: default_endpoint(),
            default_zoom: default_zoom(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_lst_range: default_fallback_lst_range(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    #[allow(dead_code)]
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Build the library session configuration with the user's overrides
    /// applied over the defaults.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            default_zoom: self.default_zoom,
            request_timeout_secs: self.request_timeout_secs,
            fallback_lst_range: self.fallback_lst_range,
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_flow_into_session_config() {
        let config = AppConfig {
            default_zoom: 11,
            request_timeout_secs: 5,
            fallback_lst_range: (40.0, 95.0),
            ..AppConfig::default()
        };
        let session = config.session_config();
        assert_eq!(session.default_zoom, 11);
        assert_eq!(session.request_timeout_secs, 5);
        assert_eq!(session.fallback_lst_range, (40.0, 95.0));
        // Untouched fields keep the library defaults.
        assert_eq!(session.lst_scale_m, 90.0);
    }
}

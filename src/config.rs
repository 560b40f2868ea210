// Copyright 2025 Chris Custine
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
//! Persistent TOML configuration via confy: feed endpoint, watch-list and
//! retention bound. The report data itself is never persisted.

use serde::{Deserialize, Serialize};

use aprs_client::ws::DEFAULT_ENDPOINT;

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Feed endpoint as a `ws://` URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Callsigns to alert on (sender or recipient)
    #[serde(default)]
    pub watch_list: Vec<String>,

    /// Maximum number of retained messages
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_messages() -> usize {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            watch_list: Vec::new(),
            max_messages: default_max_messages(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load("aprsview", "config")
    }

    /// Save configuration to disk
    #[allow(dead_code)]
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store("aprsview", "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path("aprsview", "config")
    }
}

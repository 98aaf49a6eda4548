// Copyright 2026 Muvon Un Limited
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

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_TEMPLATE: &str = include_str!("../config-templates/default.toml");

/// Chat-completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    /// Ask the endpoint for a short summary when a video is added
    pub summarize_on_add: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:13141/v1/chat/completions".to_string(),
            model: "Llama-3.2-3B-Instruct-Q4_K_M.gguf".to_string(),
            summarize_on_add: true,
        }
    }
}

/// Knowledge document location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/video_data.json"),
        }
    }
}

/// Transcript fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Caption languages in preference order; any track is used when none match
    pub languages: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            languages: ["en", "zh", "zh-cn", "zh-tw", "zh-TW"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 10,
        }
    }
}

/// Web UI server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub port_attempts: u16,
    pub open_browser: bool,
    /// Sessions untouched for this long are dropped
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            port_attempts: 30,
            open_browser: true,
            session_idle_secs: 1800,
        }
    }
}

/// Main configuration for tubechat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub storage: StorageConfig,
    pub transcript: TranscriptConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from config.toml file
    /// First tries to load from system config directory, falls back to embedded template
    pub fn load() -> Result<Self> {
        let config_path = crate::storage::get_system_config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?
        } else {
            // Config doesn't exist, create from template
            let config = Self::from_toml_str(DEFAULT_TEMPLATE)?;

            if let Some(parent) = config_path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&config_path, DEFAULT_TEMPLATE)?;

            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment variables (also read from .env) win over the file
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("TUBECHAT_ENDPOINT") {
            self.completion.endpoint = endpoint;
        }
        if let Some(model) = lookup("TUBECHAT_MODEL") {
            self.completion.model = model;
        }
        if let Some(path) = lookup("TUBECHAT_DATA_PATH") {
            self.storage.data_path = PathBuf::from(path);
        }
    }
}

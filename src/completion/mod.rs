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

pub mod client;
pub mod sse;
pub mod types;

use serde::{Deserialize, Serialize};

pub use client::CompletionClient;

/// Where and with which model questions are sent. Editable per session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointSettings {
    pub endpoint: String,
    pub model: String,
}

impl EndpointSettings {
    /// An empty endpoint means answers fall back to the transcript itself
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

impl From<&crate::config::CompletionConfig> for EndpointSettings {
    fn from(config: &crate::config::CompletionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        }
    }
}

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

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::Orchestrator;
use crate::completion::{CompletionClient, EndpointSettings};
use crate::session::Session;
use crate::transcript::{FetchedTranscript, TranscriptError, TranscriptSource};

/// What the fake source answers for every URL
pub enum Canned {
    Transcript { title: &'static str, text: &'static str },
    NoCaptions { title: &'static str },
    InvalidUrl,
}

pub struct CannedSource {
    canned: Canned,
    pub calls: AtomicUsize,
}

impl CannedSource {
    pub fn new(canned: Canned) -> Arc<Self> {
        Arc::new(Self {
            canned,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TranscriptSource for CannedSource {
    async fn fetch(&self, url: &str) -> Result<FetchedTranscript, TranscriptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.canned {
            Canned::Transcript { title, text } => Ok(FetchedTranscript {
                title: title.to_string(),
                transcript: text.to_string(),
            }),
            Canned::NoCaptions { title } => Err(TranscriptError::NoCaptions {
                title: title.to_string(),
            }),
            Canned::InvalidUrl => Err(TranscriptError::InvalidUrl(url.to_string())),
        }
    }
}

pub fn orchestrator(source: Arc<CannedSource>) -> Orchestrator {
    Orchestrator::new(source, CompletionClient::new().unwrap())
}

pub fn offline_session(dir: &Path) -> Session {
    Session::open(
        dir.join("video_data.json"),
        EndpointSettings {
            endpoint: String::new(),
            model: "test-model".to_string(),
        },
    )
}

pub fn session_with_endpoint(dir: &Path, endpoint: String) -> Session {
    Session::open(
        dir.join("video_data.json"),
        EndpointSettings {
            endpoint,
            model: "test-model".to_string(),
        },
    )
}

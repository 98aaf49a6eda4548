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

pub mod youtube;

use async_trait::async_trait;
use thiserror::Error;

pub use youtube::YoutubeTranscriptSource;

/// Title and caption text of one video
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTranscript {
    pub title: String,
    pub transcript: String,
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Video '{title}' has no available subtitles")]
    NoCaptions { title: String },

    #[error("Could not fetch video data: {0}")]
    Unavailable(String),
}

/// Anything that can turn a video URL into a title and transcript
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedTranscript, TranscriptError>;
}

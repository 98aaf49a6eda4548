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

use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::completion::{CompletionClient, EndpointSettings};
use crate::conversation::Role;
use crate::knowledge::formatting::truncate_chars;
use crate::knowledge::types::VideoEntry;
use crate::session::{Notice, Session};
use crate::transcript::{TranscriptError, TranscriptSource};

#[cfg(test)]
pub(crate) mod test_support;

/// Question used for the summary stored with a new video
pub const SUMMARY_QUESTION: &str = "Please provide a brief summary of this video content.";

#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing or empty user input; nothing changed
    #[error("{0}")]
    Input(&'static str),

    #[error(transparent)]
    SourceUnavailable(#[from] TranscriptError),
}

/// Answer used when no completion endpoint is configured
pub fn fallback_answer(transcript: &str) -> String {
    format!("Based on the video content: {}", transcript)
}

/// Runs the add-video and ask-question flows against a session
pub struct Orchestrator {
    source: Arc<dyn TranscriptSource>,
    client: CompletionClient,
    summarize_on_add: bool,
    streaming: bool,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn TranscriptSource>, client: CompletionClient) -> Self {
        Self {
            source,
            client,
            summarize_on_add: true,
            streaming: true,
        }
    }

    pub fn with_summaries(mut self, enabled: bool) -> Self {
        self.summarize_on_add = enabled;
        self
    }

    /// Buffered answers arrive as a single fragment
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.streaming = enabled;
        self
    }

    /// Fetch a transcript and store it as a new video.
    /// Nothing is stored when the fetch fails.
    #[instrument(skip(self, session), fields(session = %session.id()))]
    pub async fn add_video(&self, session: &mut Session, url: &str) -> Result<VideoEntry, ChatError> {
        if url.trim().is_empty() {
            return Err(input_error(session, "Please enter a YouTube video URL"));
        }

        let fetched = match self.source.fetch(url.trim()).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(url, error = %e, "Could not add video");
                let notice = match &e {
                    TranscriptError::NoCaptions { .. } => Notice::warning(e.to_string()),
                    _ => Notice::error(format!("Error adding video: {}", e)),
                };
                session.notify(notice);
                return Err(e.into());
            }
        };

        session.notify(Notice::info(format!("Video Title: {}", fetched.title)));

        // Stored before the summary request; the summary is attached afterwards
        let entry = VideoEntry::new(fetched.title, url.to_string(), fetched.transcript, None);
        session.add_video(entry.clone());
        let index = session.videos().len() - 1;

        info!(
            title = %entry.title,
            tokens = entry.token_count,
            "Video added to knowledge base"
        );
        session.notify(Notice::success(format!(
            "Added video '{}' to knowledge base! (Tokens: {})",
            entry.title, entry.token_count
        )));

        let settings = session.settings().clone();
        let Some(summary) = self.summarize(&settings, &entry.transcript).await else {
            return Ok(entry);
        };

        match session.attach_summary(index, summary) {
            Some(summarized) => {
                debug!(title = %summarized.title, "Summary stored");
                Ok(summarized)
            }
            None => Ok(entry),
        }
    }

    async fn summarize(&self, settings: &EndpointSettings, transcript: &str) -> Option<String> {
        if !self.summarize_on_add || !settings.is_configured() {
            return None;
        }

        match self
            .client
            .try_complete(settings, SUMMARY_QUESTION, transcript)
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Summary request failed, storing video without summary");
                None
            }
        }
    }

    /// Answer a question about the selected video.
    ///
    /// The user turn is recorded before the answer is known. Every fragment is
    /// passed to `on_fragment` in order; the assistant turn holds the full text.
    #[instrument(skip(self, session, question, on_fragment), fields(session = %session.id()))]
    pub async fn ask<F>(
        &self,
        session: &mut Session,
        question: &str,
        mut on_fragment: F,
    ) -> Result<String, ChatError>
    where
        F: FnMut(&str) + Send,
    {
        let Some(transcript) = session.selected_video().map(|v| v.transcript.clone()) else {
            return Err(input_error(session, "Please add and select a video first"));
        };

        let question = question.trim();
        if question.is_empty() {
            return Err(input_error(session, "Please enter a question"));
        }

        session.conversation_mut().append(Role::User, question);
        let settings = session.settings().clone();

        let answer = if settings.is_configured() && !self.streaming {
            let answer = self.client.complete(&settings, question, &transcript).await;
            on_fragment(&answer);
            answer
        } else if settings.is_configured() {
            let mut fragments = self.client.complete_streaming(&settings, question, &transcript);
            let mut answer = String::new();
            while let Some(fragment) = fragments.next().await {
                answer.push_str(&fragment);
                on_fragment(&fragment);
            }
            answer
        } else {
            let answer = fallback_answer(&transcript);
            on_fragment(&answer);
            answer
        };

        session
            .conversation_mut()
            .append(Role::Assistant, answer.clone());
        info!(
            answer_len = answer.len(),
            turns = session.conversation().len(),
            "Question answered"
        );

        Ok(answer)
    }

    /// Delete by position, reporting the outcome as a notice
    pub fn delete_video(&self, session: &mut Session, index: usize) -> Option<VideoEntry> {
        match session.remove_video(index) {
            Some(entry) => {
                info!(session = %session.id(), title = %entry.title, "Video deleted");
                session.notify(Notice::success(format!(
                    "Deleted video: {}",
                    truncate_chars(&entry.title, 30)
                )));
                Some(entry)
            }
            None => {
                session.notify(Notice::warning(format!("No video at position {}", index + 1)));
                None
            }
        }
    }
}

fn input_error(session: &mut Session, message: &'static str) -> ChatError {
    session.notify(Notice::warning(message));
    ChatError::Input(message)
}

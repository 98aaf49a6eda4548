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

use anyhow::Context;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument, warn};

use crate::completion::sse::{parse_sse_line, LineBuffer, SseLine};
use crate::completion::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, UpstreamError,
};
use crate::completion::EndpointSettings;

/// Sampling temperature sent with every request
pub const TEMPERATURE: f32 = 0.7;

/// Upper bound on generated tokens per answer
pub const MAX_TOKENS: u32 = 1000;

/// Applies to the whole request, streamed body included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Fragments buffered between the reader task and the consumer
const FRAGMENT_BUFFER: usize = 64;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided video transcript. \
Please answer the user's question using only the information from the video transcript. \
If the answer cannot be found in the transcript, please say so clearly.";

/// Ordered, finite fragments of one streamed answer
pub type FragmentStream = ReceiverStream<String>;

pub fn build_user_prompt(question: &str, transcript: &str) -> String {
    format!(
        "Video Transcript:\n{}\n\nQuestion: {}\n\nPlease answer the question based on the video transcript above.",
        transcript, question
    )
}

pub fn build_request(
    model: &str,
    question: &str,
    transcript: &str,
    stream: bool,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(question, transcript)),
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        stream,
    }
}

/// Client for OpenAI-compatible chat completion endpoints.
///
/// Endpoint and model come from the caller on every call, so session edits
/// take effect on the next request.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for CompletionClient")?;

        Ok(Self { client })
    }

    /// Buffered completion with typed failures
    #[instrument(skip(self, question, transcript), fields(endpoint = %settings.endpoint, transcript_len = transcript.len()))]
    pub async fn try_complete(
        &self,
        settings: &EndpointSettings,
        question: &str,
        transcript: &str,
    ) -> Result<String, UpstreamError> {
        let request = build_request(&settings.model, question, transcript, false);

        let response = self
            .client
            .post(&settings.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| UpstreamError::InvalidResponse("response contained no choices".to_string()))
    }

    /// Buffered completion. Failures come back as the answer text.
    pub async fn complete(
        &self,
        settings: &EndpointSettings,
        question: &str,
        transcript: &str,
    ) -> String {
        match self.try_complete(settings, question, transcript).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Completion request failed");
                e.to_string()
            }
        }
    }

    /// Streamed completion. A reader task feeds fragments through a channel in
    /// arrival order; a failure becomes one final fragment carrying the error text.
    pub fn complete_streaming(
        &self,
        settings: &EndpointSettings,
        question: &str,
        transcript: &str,
    ) -> FragmentStream {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let client = self.client.clone();
        let endpoint = settings.endpoint.clone();
        let request = build_request(&settings.model, question, transcript, true);

        tokio::spawn(async move {
            if let Err(e) = stream_fragments(&client, &endpoint, &request, &tx).await {
                warn!(endpoint = %endpoint, error = %e, "Streaming completion failed");
                let _ = tx.send(e.to_string()).await;
            }
        });

        ReceiverStream::new(rx)
    }
}

async fn stream_fragments(
    client: &reqwest::Client,
    endpoint: &str,
    request: &ChatCompletionRequest,
    tx: &mpsc::Sender<String>,
) -> Result<(), UpstreamError> {
    let response = client
        .post(endpoint)
        .header(CONTENT_TYPE, "application/json")
        .json(request)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let mut body = response.bytes_stream();
    let mut lines = LineBuffer::new();
    let mut fragments = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for line in lines.push(&chunk) {
            match parse_sse_line(&line) {
                SseLine::Fragment(text) => {
                    fragments += 1;
                    if tx.send(text).await.is_err() {
                        debug!("Fragment receiver dropped, abandoning stream");
                        return Ok(());
                    }
                }
                SseLine::Done => {
                    debug!(fragments, "Stream finished with sentinel");
                    return Ok(());
                }
                SseLine::Skip => {}
            }
        }
    }

    // Body ended without a sentinel; flush an unterminated last line
    if let Some(line) = lines.finish() {
        if let SseLine::Fragment(text) = parse_sse_line(&line) {
            fragments += 1;
            let _ = tx.send(text).await;
        }
    }

    debug!(fragments, "Stream ended without sentinel");
    Ok(())
}

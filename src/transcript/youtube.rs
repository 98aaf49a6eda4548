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
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::TranscriptConfig;
use crate::transcript::{FetchedTranscript, TranscriptError, TranscriptSource};

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Caption track as listed in the watch page player response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode", default)]
    pub language_code: String,
    /// `asr` for auto-generated captions
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: Option<String>,
}

/// Scrapes titles and captions from youtube.com
pub struct YoutubeTranscriptSource {
    client: reqwest::Client,
    base_url: String,
    languages: Vec<String>,
}

impl YoutubeTranscriptSource {
    pub fn new(config: &TranscriptConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client for YoutubeTranscriptSource")?;

        Ok(Self {
            client,
            base_url: YOUTUBE_BASE_URL.to_string(),
            languages: config.languages.clone(),
        })
    }

    /// Talk to another host instead of youtube.com
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_text(&self, url: &str) -> Result<String, TranscriptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TranscriptError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptError::Unavailable(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| TranscriptError::Unavailable(e.to_string()))
    }

    async fn fetch_oembed_title(&self, video_id: &str) -> Option<String> {
        let url = format!(
            "{}/oembed?url=https://www.youtube.com/watch?v={}&format=json",
            self.base_url, video_id
        );

        let body = match self.get_text(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(video_id, error = %e, "oEmbed title lookup failed");
                return None;
            }
        };

        match serde_json::from_str::<OEmbed>(&body) {
            Ok(OEmbed { title: Some(title) }) if !title.trim().is_empty() => {
                Some(title.trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                warn!(video_id, error = %e, "oEmbed response was not valid JSON");
                None
            }
        }
    }

    async fn resolve_title(&self, video_id: &str, page: &str) -> String {
        if let Some(title) = extract_page_title(page) {
            return title;
        }
        if let Some(title) = self.fetch_oembed_title(video_id).await {
            return title;
        }
        format!("YouTube Video {}", video_id)
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedTranscript, TranscriptError> {
        let video_id = extract_video_id(url)?;

        let page = self
            .get_text(&format!("{}/watch?v={}", self.base_url, video_id))
            .await?;
        let title = self.resolve_title(&video_id, &page).await;

        let tracks = extract_caption_tracks(&page);
        let Some(track) = select_track(&tracks, &self.languages) else {
            debug!(video_id = %video_id, "Watch page lists no caption tracks");
            return Err(TranscriptError::NoCaptions { title });
        };

        let xml = self.get_text(&track.base_url).await.map_err(|e| {
            warn!(video_id = %video_id, error = %e, "Caption download failed");
            TranscriptError::NoCaptions {
                title: title.clone(),
            }
        })?;

        let transcript = parse_timedtext(&xml).join(" ");
        if transcript.trim().is_empty() {
            return Err(TranscriptError::NoCaptions { title });
        }

        info!(
            video_id = %video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "Fetched captions"
        );

        Ok(FetchedTranscript { title, transcript })
    }
}

/// Pull the video id out of watch, shorts and youtu.be links
pub fn extract_video_id(url: &str) -> Result<String, TranscriptError> {
    let url = url.trim();

    let raw = if url.contains("youtube.com/watch?v=") {
        url.rsplit("v=").next().and_then(|rest| rest.split('&').next())
    } else if url.contains("youtube.com/shorts/") {
        url.rsplit("/shorts/").next().and_then(|rest| rest.split('?').next())
    } else if url.contains("youtu.be/") {
        url.rsplit("youtu.be/").next().and_then(|rest| rest.split('?').next())
    } else {
        None
    };

    match raw.map(|id| id.trim_end_matches('/')) {
        Some(id)
            if !id.is_empty()
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            Ok(id.to_string())
        }
        _ => Err(TranscriptError::InvalidUrl(url.to_string())),
    }
}

/// `<title>` of the watch page without the site suffix
pub fn extract_page_title(html: &str) -> Option<String> {
    let start = html.find("<title>")?;
    let end = html[start..].find("</title>")?;
    let raw = &html[start + 7..start + end];

    let title = decode_entities(raw);
    let title = title.replace(" - YouTube", "");
    let title = title.trim();

    if title.is_empty() || title == "YouTube" {
        None
    } else {
        Some(title.to_string())
    }
}

/// Caption tracks embedded in the watch page, empty when the video has none
pub fn extract_caption_tracks(html: &str) -> Vec<CaptionTrack> {
    const KEY: &str = "\"captionTracks\":";

    let Some(pos) = html.find(KEY) else {
        return Vec::new();
    };

    // Only the leading array is read; the rest of the page is ignored
    let mut tracks =
        serde_json::Deserializer::from_str(&html[pos + KEY.len()..]).into_iter::<Vec<CaptionTrack>>();

    match tracks.next() {
        Some(Ok(tracks)) => tracks,
        Some(Err(e)) => {
            warn!(error = %e, "Could not parse caption track list");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Best track for the language preference: manual before generated per
/// language, then the first listed track
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    for language in languages {
        let mut candidates = tracks.iter().filter(|t| &t.language_code == language);
        let first = candidates.next();
        if let Some(manual) = first
            .into_iter()
            .chain(candidates)
            .find(|t| !t.is_generated())
        {
            return Some(manual);
        }
        if first.is_some() {
            return first;
        }
    }
    tracks.first()
}

/// Text segments of a timed-text XML document, in caption order
pub fn parse_timedtext(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    // Raw text of the open <text> element, entity references kept verbatim
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"text" => current = Some(String::new()),
            Ok(Event::Text(t)) => {
                if let Some(raw) = current.as_mut() {
                    raw.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if let Some(raw) = current.as_mut() {
                    raw.push('&');
                    raw.push_str(&String::from_utf8_lossy(&r));
                    raw.push(';');
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"text" => {
                if let Some(raw) = current.take() {
                    let text = decode_entities(&raw).replace('\n', " ");
                    let text = text.trim();
                    if !text.is_empty() {
                        segments.push(text.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(position = reader.buffer_position(), error = %e, "Malformed timed-text XML");
                break;
            }
            Ok(_) => {}
        }
    }

    segments
}

/// Caption text is escaped twice (`&amp;#39;`), so unescape until stable
fn decode_entities(raw: &str) -> String {
    let once = quick_xml::escape::unescape(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let twice = quick_xml::escape::unescape(&once).map(|text| text.into_owned());
    twice.unwrap_or(once)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track(code: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.test/{}", code),
            language_code: code.to_string(),
            kind: kind.map(|k| k.to_string()),
        }
    }

    fn languages() -> Vec<String> {
        TranscriptConfig::default().languages
    }

    fn source_for(server: &MockServer) -> YoutubeTranscriptSource {
        YoutubeTranscriptSource::new(&TranscriptConfig::default())
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_extract_video_id_variants() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/abc_-123?feature=share").unwrap(),
            "abc_-123"
        );
        assert_eq!(extract_video_id("https://youtu.be/xyz789?si=q").unwrap(), "xyz789");
    }

    #[test]
    fn test_extract_video_id_rejects_other_urls() {
        for url in [
            "",
            "https://vimeo.com/12345",
            "https://www.youtube.com/watch?v=",
            "https://www.youtube.com/watch?v=<script>",
            "not a url",
        ] {
            assert!(
                matches!(extract_video_id(url), Err(TranscriptError::InvalidUrl(_))),
                "accepted {url:?}"
            );
        }
    }

    #[test]
    fn test_extract_page_title() {
        let html = "<html><head><title>Rust &amp; WebAssembly - YouTube</title></head></html>";
        assert_eq!(extract_page_title(html).unwrap(), "Rust & WebAssembly");
        assert_eq!(extract_page_title("<title> - YouTube</title>"), None);
        assert_eq!(extract_page_title("<title>YouTube</title>"), None);
        assert_eq!(extract_page_title("<p>no title</p>"), None);
    }

    #[test]
    fn test_extract_caption_tracks() {
        let html = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","name":{"simpleText":"English [auto]"},"languageCode":"en","kind":"asr"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=zh-TW","name":{"simpleText":"中文 (台灣) ]"},"languageCode":"zh-TW"}],"audioTracks":[]}}};</script>"#;

        let tracks = extract_caption_tracks(html);
        assert_eq!(tracks.len(), 2);
        assert_eq!(
            tracks[0].base_url,
            "https://www.youtube.com/api/timedtext?v=abc&lang=en"
        );
        assert!(tracks[0].is_generated());
        assert_eq!(tracks[1].language_code, "zh-TW");
    }

    #[test]
    fn test_extract_caption_tracks_missing() {
        assert!(extract_caption_tracks("<html>no captions here</html>").is_empty());
    }

    #[test]
    fn test_select_track_prefers_language_order_then_manual() {
        let tracks = vec![
            track("fr", None),
            track("zh-TW", None),
            track("en", Some("asr")),
            track("en", None),
        ];
        let selected = select_track(&tracks, &languages()).unwrap();
        assert_eq!(selected.language_code, "en");
        assert!(!selected.is_generated());

        let tracks = vec![track("fr", None), track("zh-TW", None)];
        assert_eq!(
            select_track(&tracks, &languages()).unwrap().language_code,
            "zh-TW"
        );

        let tracks = vec![track("de", Some("asr")), track("fr", None)];
        assert_eq!(select_track(&tracks, &languages()).unwrap().language_code, "de");

        assert!(select_track(&[], &languages()).is_none());
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0.08" dur="2.1">we&amp;#39;re going to
learn Rust</text><text start="2.2" dur="0.5"/><text start="3" dur="1">   </text><text start="4" dur="1">fish &amp;amp; chips</text></transcript>"#;

        assert_eq!(
            parse_timedtext(xml),
            vec!["we're going to learn Rust".to_string(), "fish & chips".to_string()]
        );
    }

    #[test]
    fn test_parse_timedtext_reads_elements_not_substrings() {
        let xml = r#"<transcript><text start="1" note="a>b">first</text><textual>skip me</textual><text start="2">second &lt;b&gt;</text></transcript>"#;

        assert_eq!(
            parse_timedtext(xml),
            vec!["first".to_string(), "second <b>".to_string()]
        );
    }

    #[test]
    fn test_parse_timedtext_keeps_segments_before_malformed_tail() {
        let xml = r#"<transcript><text start="0">kept</text><text start="1">broken</transcript>"#;

        assert_eq!(parse_timedtext(xml), vec!["kept".to_string()]);
    }

    #[test]
    fn test_extract_caption_tracks_ignores_rest_of_page() {
        let html = r#"{"captionTracks": [{"baseUrl":"https://x/t?lang=en","languageCode":"en","name":{"simpleText":"a [b] \"c\""}}],"audioTracks":[[1,2],{"x":"]"}]} ]]] trailing script"#;

        let tracks = extract_caption_tracks(html);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "en");

        assert!(extract_caption_tracks(r#""captionTracks":{"not":"an array"}"#).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_title_and_transcript() {
        let server = MockServer::start().await;
        let page = format!(
            r#"<html><head><title>Ownership Explained - YouTube</title></head><body><script>{{"captionTracks":[{{"baseUrl":"{}/api/timedtext?v=abc123&lang=en","languageCode":"en"}}]}}</script></body></html>"#,
            server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<transcript><text start="0" dur="1">Hello</text><text start="1" dur="1">world</text></transcript>"#,
            ))
            .mount(&server)
            .await;

        let fetched = source_for(&server)
            .fetch("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap();

        assert_eq!(fetched.title, "Ownership Explained");
        assert_eq!(fetched.transcript, "Hello world");
    }

    #[tokio::test]
    async fn test_fetch_without_captions_reports_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><head><title>YouTube</title></head></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"title":"Silent Film","author_name":"x"}"#),
            )
            .mount(&server)
            .await;

        let err = source_for(&server)
            .fetch("https://youtube.com/shorts/silent1")
            .await
            .unwrap_err();

        match err {
            TranscriptError::NoCaptions { title } => assert_eq!(title, "Silent Film"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_synthesized_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = source_for(&server)
            .fetch("https://youtu.be/vid42")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Video 'YouTube Video vid42' has no available subtitles");
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = source_for(&server)
            .fetch("https://example.com/video")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::InvalidUrl(_)));
    }
}

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Format of the `timestamp` field in the knowledge document
pub const ADDED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One video in the knowledge base. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub title: String,
    pub url: String,
    #[serde(rename = "timestamp", with = "added_at_format")]
    pub added_at: NaiveDateTime,
    #[serde(rename = "context")]
    pub transcript: String,
    #[serde(rename = "tokens")]
    pub token_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl VideoEntry {
    /// Build an entry stamped with the current local time
    pub fn new(title: String, url: String, transcript: String, summary: Option<String>) -> Self {
        let now = Local::now().naive_local();
        Self {
            title,
            url,
            // The document stores seconds only
            added_at: now.with_nanosecond(0).unwrap_or(now),
            token_count: count_tokens(&transcript),
            transcript,
            summary,
        }
    }

    pub fn added_at_display(&self) -> String {
        self.added_at.format(ADDED_AT_FORMAT).to_string()
    }
}

/// Rough token estimate: whitespace-separated words * 1.3, truncated
pub fn count_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    (words as f64 * 1.3) as u64
}

mod added_at_format {
    use super::ADDED_AT_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(ADDED_AT_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, ADDED_AT_FORMAT).map_err(serde::de::Error::custom)
    }
}

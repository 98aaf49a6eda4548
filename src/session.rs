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

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::completion::EndpointSettings;
use crate::conversation::ConversationLog;
use crate::knowledge::store::KnowledgeStore;
use crate::knowledge::types::VideoEntry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible, non-fatal message waiting to be rendered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything one UI session works on: the knowledge base, the selection,
/// the chat history and the endpoint settings.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    store: KnowledgeStore,
    selected: Option<usize>,
    conversation: ConversationLog,
    settings: EndpointSettings,
    notices: Vec<Notice>,
}

impl Session {
    /// Start a session, reading the knowledge document once.
    /// A broken document leaves the session empty with an error notice.
    pub fn open(data_path: impl Into<PathBuf>, settings: EndpointSettings) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            store: KnowledgeStore::new(data_path),
            selected: None,
            conversation: ConversationLog::new(),
            settings,
            notices: Vec::new(),
        };
        session.load_document();
        session
    }

    fn load_document(&mut self) {
        match self.store.reload() {
            Ok(()) => info!(
                session = %self.id,
                path = %self.store.path().display(),
                videos = self.store.len(),
                "Knowledge document loaded"
            ),
            Err(e) => {
                warn!(session = %self.id, error = %e, "Failed to load knowledge document");
                self.notify(Notice::error(format!("Error loading JSON file: {:#}", e)));
            }
        }
    }

    /// Write the document; failures only produce a notice
    pub fn persist(&mut self) -> bool {
        match self.store.save() {
            Ok(()) => true,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Failed to save knowledge document");
                self.notify(Notice::error(format!("Error saving JSON file: {:#}", e)));
                false
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn videos(&self) -> &[VideoEntry] {
        self.store.entries()
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Append and persist immediately
    pub fn add_video(&mut self, entry: VideoEntry) {
        self.store.append(entry);
        self.persist();
    }

    /// Store a summary for an existing video and persist
    pub fn attach_summary(&mut self, index: usize, summary: String) -> Option<VideoEntry> {
        let entry = self.store.set_summary(index, summary)?.clone();
        self.persist();
        Some(entry)
    }

    /// Remove by position and persist; the selection follows its entry
    pub fn remove_video(&mut self, index: usize) -> Option<VideoEntry> {
        let removed = self.store.remove_at(index)?;

        self.selected = match self.selected {
            Some(selected) if selected == index => None,
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };

        self.persist();
        Some(removed)
    }

    /// Select by position; out-of-range positions are rejected
    pub fn select_video(&mut self, index: usize) -> bool {
        if index < self.store.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Explicit selection, or the first video when nothing was picked
    pub fn selected_index(&self) -> Option<usize> {
        match self.selected {
            Some(index) => Some(index),
            None if !self.store.is_empty() => Some(0),
            None => None,
        }
    }

    pub fn selected_video(&self) -> Option<&VideoEntry> {
        self.selected_index().and_then(|index| self.store.get(index))
    }

    pub fn conversation(&self) -> &ConversationLog {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut ConversationLog {
        &mut self.conversation
    }

    pub fn clear_conversation(&mut self) {
        self.conversation.clear();
    }

    pub fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    /// Takes effect on the next completion call; nothing is validated here
    pub fn update_settings(&mut self, endpoint: Option<String>, model: Option<String>) {
        if let Some(endpoint) = endpoint {
            self.settings.endpoint = endpoint;
        }
        if let Some(model) = model {
            self.settings.model = model;
        }
    }

    /// Switch to another document and read it
    pub fn set_data_path(&mut self, path: impl Into<PathBuf>) {
        self.store.set_path(path);
        self.selected = None;
        self.load_document();
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::store::load_entries;

    fn settings() -> EndpointSettings {
        EndpointSettings {
            endpoint: String::new(),
            model: "m".to_string(),
        }
    }

    fn video(title: &str) -> VideoEntry {
        VideoEntry::new(
            title.to_string(),
            format!("https://youtu.be/{}", title),
            format!("{} transcript", title),
            None,
        )
    }

    #[test]
    fn test_open_missing_document_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::open(dir.path().join("video_data.json"), settings());

        assert!(session.videos().is_empty());
        assert!(session.take_notices().is_empty());
        assert_eq!(session.selected_index(), None);
    }

    #[test]
    fn test_open_corrupt_document_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video_data.json");
        std::fs::write(&path, "not json").unwrap();

        let mut session = Session::open(&path, settings());

        assert!(session.videos().is_empty());
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.starts_with("Error loading JSON file"));
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn test_mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video_data.json");
        let mut session = Session::open(&path, settings());

        session.add_video(video("a"));
        session.add_video(video("b"));
        assert_eq!(load_entries(&path).unwrap().len(), 2);

        session.remove_video(0);
        let on_disk = load_entries(&path).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].title, "b");
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        let path = dir.path().join("video_data.json");
        std::fs::create_dir(&path).unwrap();

        let mut session = Session::open(&path, settings());
        session.take_notices();
        session.add_video(video("kept"));

        assert_eq!(session.videos().len(), 1);
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.starts_with("Error saving JSON file"));
    }

    #[test]
    fn test_selection_follows_removals() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::open(dir.path().join("video_data.json"), settings());
        for title in ["a", "b", "c"] {
            session.add_video(video(title));
        }

        assert_eq!(session.selected_index(), Some(0));
        assert!(session.select_video(2));
        assert!(!session.select_video(3));

        session.remove_video(0);
        assert_eq!(session.selected_video().unwrap().title, "c");

        session.remove_video(1);
        // Selected entry gone: back to the default first entry
        assert_eq!(session.selected_index(), Some(0));
        assert_eq!(session.selected_video().unwrap().title, "b");

        assert!(session.remove_video(7).is_none());
        session.remove_video(0);
        assert_eq!(session.selected_video(), None);
    }

    #[test]
    fn test_update_settings_partial() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::open(dir.path().join("v.json"), settings());

        session.update_settings(Some("http://localhost:9/v1/chat/completions".to_string()), None);

        assert!(session.settings().is_configured());
        assert_eq!(session.settings().model, "m");
    }
}

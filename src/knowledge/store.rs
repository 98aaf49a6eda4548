use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::knowledge::types::VideoEntry;

/// Read the knowledge document. A missing file is an empty knowledge base.
pub fn load_entries(path: &Path) -> Result<Vec<VideoEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries: Vec<VideoEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    debug!(path = %path.display(), count = entries.len(), "Loaded knowledge document");
    Ok(entries)
}

/// Rewrite the whole knowledge document as indented UTF-8 JSON
pub fn save_entries(path: &Path, entries: &[VideoEntry]) -> Result<()> {
    crate::storage::ensure_parent_dir(path)
        .with_context(|| format!("Failed to create directory for {}", path.display()))?;

    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    debug!(path = %path.display(), count = entries.len(), "Saved knowledge document");
    Ok(())
}

/// Ordered, in-memory collection of videos backed by a JSON document.
/// The in-memory sequence stays authoritative even when disk I/O fails.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    path: PathBuf,
    entries: Vec<VideoEntry>,
}

impl KnowledgeStore {
    /// Empty store bound to `path`; nothing is read until [`reload`](Self::reload)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Replace the in-memory entries with the document contents.
    /// On error the store is left empty.
    pub fn reload(&mut self) -> Result<()> {
        self.entries.clear();
        self.entries = load_entries(&self.path)?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        save_entries(&self.path, &self.entries)
    }

    pub fn append(&mut self, entry: VideoEntry) {
        self.entries.push(entry);
    }

    pub fn remove_at(&mut self, index: usize) -> Option<VideoEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Fill in the summary of a stored entry; other fields never change
    pub fn set_summary(&mut self, index: usize, summary: String) -> Option<&VideoEntry> {
        let entry = self.entries.get_mut(index)?;
        entry.summary = Some(summary);
        Some(entry)
    }

    pub fn get(&self, index: usize) -> Option<&VideoEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[VideoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the store at another document. Entries are kept until the next reload.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }
}

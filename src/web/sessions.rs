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

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::completion::EndpointSettings;
use crate::session::Session;

pub type SessionHandle = Arc<Mutex<Session>>;

struct SessionSlot {
    handle: SessionHandle,
    last_access: Instant,
}

/// In-memory sessions keyed by id. Each browser tab gets its own.
pub struct SessionRegistry {
    data_path: PathBuf,
    settings: EndpointSettings,
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
}

impl SessionRegistry {
    pub fn new(data_path: PathBuf, settings: EndpointSettings) -> Self {
        Self {
            data_path,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session on the configured document with the default settings
    pub async fn create(&self) -> (Uuid, SessionHandle) {
        let session = Session::open(self.data_path.clone(), self.settings.clone());
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            SessionSlot {
                handle: handle.clone(),
                last_access: Instant::now(),
            },
        );
        (id, handle)
    }

    /// Look up a session and mark it as used
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions.get_mut(&id)?;
        slot.last_access = Instant::now();
        Some(slot.handle.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions untouched for longer than `max_idle` as of `now`.
    /// A session still held by a request is kept.
    pub async fn evict_idle(&self, max_idle: Duration, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let idle = now.saturating_duration_since(slot.last_access) > max_idle;
            let in_use = Arc::strong_count(&slot.handle) > 1;
            if idle && !in_use {
                debug!(session = %id, "Evicting idle session");
                return false;
            }
            true
        });
        before - sessions.len()
    }

    /// Periodically evict idle sessions. A zero `max_idle` disables eviction.
    pub fn spawn_sweeper(self: &Arc<Self>, max_idle: Duration) -> Option<JoinHandle<()>> {
        if max_idle.is_zero() {
            return None;
        }

        let registry = Arc::clone(self);
        let period = max_idle.min(Duration::from_secs(60));
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle(max_idle, Instant::now()).await;
                if evicted > 0 {
                    debug!(evicted, "Idle sessions removed");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(dir: &std::path::Path) -> SessionRegistry {
        SessionRegistry::new(
            dir.join("video_data.json"),
            EndpointSettings {
                endpoint: String::new(),
                model: "m".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());

        let (first, first_handle) = registry.create().await;
        let (second, _) = registry.create().await;
        assert_ne!(first, second);
        assert_eq!(registry.len().await, 2);

        first_handle
            .lock()
            .await
            .update_settings(None, Some("changed".to_string()));

        let second_handle = registry.get(second).await.unwrap();
        assert_eq!(second_handle.lock().await.settings().model, "m");
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_session_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let (id, handle) = registry.create().await;
        drop(handle);

        let later = Instant::now() + Duration::from_secs(2 * 3600);
        assert_eq!(registry.evict_idle(Duration::from_secs(1800), later).await, 1);
        assert_eq!(registry.len().await, 0);
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_recent_session_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let (id, handle) = registry.create().await;
        drop(handle);

        let evicted = registry
            .evict_idle(Duration::from_secs(1800), Instant::now())
            .await;
        assert_eq!(evicted, 0);
        assert!(registry.get(id).await.is_some());
    }

    #[tokio::test]
    async fn test_session_in_use_survives_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let (id, handle) = registry.create().await;

        let later = Instant::now() + Duration::from_secs(2 * 3600);
        assert_eq!(registry.evict_idle(Duration::from_secs(1800), later).await, 0);
        assert_eq!(registry.len().await, 1);

        drop(handle);
        assert_eq!(registry.evict_idle(Duration::from_secs(1800), later).await, 1);
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(registry(dir.path()));
        let (_, handle) = registry.create().await;
        drop(handle);

        let sweeper = registry.spawn_sweeper(Duration::from_secs(30)).unwrap();
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(registry.len().await, 0);
        sweeper.abort();
    }

    #[test]
    fn test_zero_idle_disables_sweeper() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(registry(dir.path()));
        assert!(registry.spawn_sweeper(Duration::ZERO).is_none());
    }
}

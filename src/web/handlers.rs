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

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;
use uuid::Uuid;

use super::server::AppState;
use super::sessions::SessionHandle;
use crate::completion::EndpointSettings;
use crate::conversation::ConversationTurn;
use crate::session::{Notice, Session};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// One row of the video picker
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoView {
    pub index: usize,
    pub title: String,
    pub url: String,
    pub added_at: String,
    pub token_count: u64,
    pub summary: Option<String>,
}

/// Everything the page needs to re-render
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub videos: Vec<VideoView>,
    pub selected: Option<usize>,
    pub conversation: Vec<ConversationTurn>,
    pub settings: EndpointSettings,
    pub data_path: String,
    pub notices: Vec<Notice>,
}

impl SessionSnapshot {
    /// Drains pending notices; they are shown once
    fn capture(session: &mut Session) -> Self {
        let videos = session
            .videos()
            .iter()
            .enumerate()
            .map(|(index, entry)| VideoView {
                index,
                title: entry.title.clone(),
                url: entry.url.clone(),
                added_at: entry.added_at_display(),
                token_count: entry.token_count,
                summary: entry.summary.clone(),
            })
            .collect();

        Self {
            id: session.id(),
            videos,
            selected: session.selected_index(),
            conversation: session.conversation().turns().to_vec(),
            settings: session.settings().clone(),
            data_path: session.store().path().display().to_string(),
            notices: session.take_notices(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub data_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AddVideoRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
struct DoneEvent {
    answer: Option<String>,
    notices: Vec<Notice>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn session_not_found(id: Uuid) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("session {} not found", id),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = Json(serde_json::json!({
            "error": self.message,
        }))
        .into_response();
        *response.status_mut() = self.status;
        response
    }
}

type ApiResult = Result<Json<SessionSnapshot>, ApiError>;

async fn session(state: &AppState, id: Uuid) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::session_not_found(id))
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.len().await,
    }))
}

pub async fn create_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let (_, handle) = state.sessions.create().await;
    let mut session = handle.lock().await;
    Json(SessionSnapshot::capture(&mut session))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult {
    let handle = session(&state, id).await?;
    let mut session = handle.lock().await;
    Ok(Json(SessionSnapshot::capture(&mut session)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SettingsRequest>,
) -> ApiResult {
    let handle = session(&state, id).await?;
    let mut session = handle.lock().await;

    session.update_settings(payload.endpoint, payload.model);
    if let Some(data_path) = payload.data_path {
        session.set_data_path(data_path);
    }

    Ok(Json(SessionSnapshot::capture(&mut session)))
}

/// Outcome is reported through the snapshot notices
pub async fn add_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddVideoRequest>,
) -> ApiResult {
    let handle = session(&state, id).await?;
    let mut session = handle.lock().await;

    if let Err(e) = state.orchestrator.add_video(&mut session, &payload.url).await {
        debug!(session = %id, error = %e, "Add video rejected");
    }

    Ok(Json(SessionSnapshot::capture(&mut session)))
}

pub async fn delete_video(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> ApiResult {
    let handle = session(&state, id).await?;
    let mut session = handle.lock().await;

    state.orchestrator.delete_video(&mut session, index);

    Ok(Json(SessionSnapshot::capture(&mut session)))
}

pub async fn select_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectionRequest>,
) -> ApiResult {
    let handle = session(&state, id).await?;
    let mut session = handle.lock().await;

    match payload.index {
        Some(index) if !session.select_video(index) => {
            return Err(ApiError::bad_request(format!(
                "no video at index {}",
                index
            )));
        }
        Some(_) => {}
        None => session.clear_selection(),
    }

    Ok(Json(SessionSnapshot::capture(&mut session)))
}

pub async fn clear_history(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult {
    let handle = session(&state, id).await?;
    let mut session = handle.lock().await;
    session.clear_conversation();
    Ok(Json(SessionSnapshot::capture(&mut session)))
}

/// Streams `fragment` events as the answer arrives, then one `done` event
pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AskRequest>,
) -> Result<Response, ApiError> {
    let handle = session(&state, id).await?;
    let (tx, rx) = mpsc::unbounded_channel::<Event>();

    tokio::spawn(async move {
        let mut session = handle.lock_owned().await;

        let fragment_tx = tx.clone();
        let result = state
            .orchestrator
            .ask(&mut session, &payload.question, move |fragment| {
                let data = serde_json::to_string(fragment).unwrap_or_default();
                let _ = fragment_tx.send(Event::default().event("fragment").data(data));
            })
            .await;

        let done = DoneEvent {
            answer: result.ok(),
            notices: session.take_notices(),
        };
        let data = serde_json::to_string(&done).unwrap_or_default();
        let _ = tx.send(Event::default().event("done").data(data));
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<Event, Infallible>);
    let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)));
    Ok(sse.into_response())
}

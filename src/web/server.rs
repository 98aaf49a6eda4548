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

use anyhow::Result;
use axum::routing::{delete, get, post, put};
use axum::Router;
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use super::handlers;
use super::sessions::SessionRegistry;
use crate::config::ServerConfig;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/session", post(handlers::create_session))
        .route("/api/session/{id}", get(handlers::get_session))
        .route("/api/session/{id}/settings", put(handlers::update_settings))
        .route("/api/session/{id}/videos", post(handlers::add_video))
        .route(
            "/api/session/{id}/videos/{index}",
            delete(handlers::delete_video),
        )
        .route("/api/session/{id}/selection", put(handlers::select_video))
        .route("/api/session/{id}/ask", post(handlers::ask))
        .route("/api/session/{id}/history", delete(handlers::clear_history))
        .layer(cors)
        .with_state(state)
}

/// Bind the first free port in `port..port + port_attempts`
pub async fn bind_available(host: &str, port: u16, port_attempts: u16) -> Result<TcpListener> {
    for offset in 0..port_attempts.max(1) {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => debug!(port = candidate, error = %e, "Port unavailable"),
        }
    }

    anyhow::bail!(
        "No available port found between {} and {}",
        port,
        port.saturating_add(port_attempts.saturating_sub(1))
    )
}

/// Serve the UI until the process is stopped
pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let listener = bind_available(&config.host, config.port, config.port_attempts).await?;
    let url = format!("http://{}", listener.local_addr()?);

    info!(%url, "Web UI listening");
    println!("TubeChat is running at {}", url);

    if config.open_browser {
        if let Err(e) = open::that_detached(&url) {
            warn!(error = %e, "Could not open browser");
        }
    }

    let sweeper = state
        .sessions
        .spawn_sweeper(Duration::from_secs(config.session_idle_secs));

    let served = axum::serve(listener, router(state)).await;
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    served?;
    Ok(())
}

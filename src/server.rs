use std::convert::Infallible;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::{get, post},
    Form, Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    engine::ScanEngine,
    pages,
    targets::{parse_target_lines, parse_target_list},
    types::ScanEvent,
};

#[derive(Clone)]
pub struct AppState {
    engine: ScanEngine,
    shutdown: CancellationToken, // parent of every per-request scan token
}

impl AppState {
    pub fn new(engine: ScanEngine, shutdown: CancellationToken) -> Self {
        Self { engine, shutdown }
    }
}

/// Form posted from the landing page.
#[derive(Debug, Deserialize)]
pub struct ScanForm {
    #[serde(default)]
    pub ips: String,
}

/// Query of the event stream: comma-separated targets.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub ips: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/scan", post(post_scan))
        .route("/scan_stream", get(get_scan_stream))
        .route("/api/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the UI on `bind` until `shutdown` fires.
pub async fn serve(bind: &str, engine: ScanEngine, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let app = router(AppState::new(engine, shutdown.clone()));

    info!("serving UI on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server error")?;
    Ok(())
}

async fn get_index() -> impl IntoResponse {
    Html(pages::index_page())
}

async fn post_scan(Form(form): Form<ScanForm>) -> impl IntoResponse {
    let targets = parse_target_lines(&form.ips);
    info!(targets = targets.len(), "scan requested");
    Html(pages::progress_page(&targets))
}

async fn get_scan_stream(
    State(app): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let targets = parse_target_list(&query.ips);
    // The response body owns the scan; a disconnecting client drops it.
    let events = app
        .engine
        .scan_with_cancel(targets, app.shutdown.child_token())
        .map(|ev| Ok(sse_event(&ev)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn get_health() -> impl IntoResponse {
    (StatusCode::OK, Json(Health { status: "ok" }))
}

/// Frame one scan event: category as the SSE event name, rendered text as data.
pub fn sse_event(ev: &ScanEvent) -> Event {
    Event::default()
        .event(ev.category().as_str())
        .data(ev.to_string())
}

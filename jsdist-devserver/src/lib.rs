//! Development harness for trying the library in a browser.
//!
//! Serves the demo page at `/`, the unversioned script it loads at
//! `/<script>.js`, and echoes every field posted to `/` on stdout as
//! `name: value1, value2` before serving the demo page again.
//!
//! Not part of the release pipeline.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Form, Path as AxumPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

/// Files served by the harness.
pub struct AppState {
    pub demo: PathBuf,
    pub script: PathBuf,
}

impl AppState {
    /// Name under which the script is served, e.g. `DOMBuilder.js`.
    fn script_name(&self) -> Option<&str> {
        self.script.file_name().and_then(|n| n.to_str())
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(demo_handler).post(echo_handler))
        .route("/{file}", get(script_handler))
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl+C.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving demo at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received shutdown signal");
            }
        })
        .await?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn demo_handler(State(state): State<Arc<AppState>>) -> Response {
    demo_page(&state).await
}

async fn echo_handler(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    for line in format_fields(&fields) {
        println!("{line}");
    }
    tracing::debug!(fields = fields.len(), "Echoed posted form");
    demo_page(&state).await
}

async fn script_handler(State(state): State<Arc<AppState>>, AxumPath(file): AxumPath<String>) -> Response {
    if state.script_name() != Some(file.as_str()) {
        return (StatusCode::NOT_FOUND, format!("{file} not found")).into_response();
    }
    match tokio::fs::read_to_string(&state.script).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/javascript")], body).into_response(),
        Err(e) => {
            tracing::error!(path = %state.script.display(), error = %e, "Failed to read script");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn demo_page(state: &AppState) -> Response {
    match tokio::fs::read_to_string(&state.demo).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::error!(path = %state.demo.display(), error = %e, "Failed to read demo page");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// One `name: v1, v2` line per distinct field name, in order of first appearance.
pub fn format_fields(fields: &[(String, String)]) -> Vec<String> {
    let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
    for (name, value) in fields {
        match grouped.iter_mut().find(|(n, _)| *n == name.as_str()) {
            Some((_, values)) => values.push(value.as_str()),
            None => grouped.push((name.as_str(), vec![value.as_str()])),
        }
    }
    grouped
        .into_iter()
        .map(|(name, values)| format!("{name}: {}", values.join(", ")))
        .collect()
}

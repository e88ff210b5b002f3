use crate::config::AppConfig;
use crate::render::{render_page, PageMode};
use crate::shell::{Frame, Shell};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// The shell is behind one lock, so renders run one at a time.
pub struct AppState {
    pub shell: Mutex<Shell>,
}

#[derive(Deserialize)]
pub struct BudgetParams {
    #[serde(default, deserialize_with = "lenient_budget")]
    budget: Option<u64>,
}

// An empty or malformed value keeps the current budget instead of failing
// the request.
fn lenient_budget<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.trim().parse::<u64>().ok()))
}

#[derive(Serialize)]
pub struct ReloadResponse {
    reloaded: bool,
}

pub fn router(shell: Shell) -> Router {
    let state = Arc::new(AppState {
        shell: Mutex::new(shell),
    });

    Router::new()
        .route("/", get(page_handler))
        .route("/api/map", get(map_handler))
        .route("/api/reload", post(reload_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", config.server.host, config.server.port))?;

    let app = router(Shell::new(config));

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn page_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BudgetParams>,
) -> Response {
    let result = tokio::task::block_in_place(|| {
        let mut shell = lock_shell(&state);
        let frame = run(&mut shell, params.budget);
        render_page(shell.config(), &frame, PageMode::Interactive)
    });

    match result {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::error!("failed to render page: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render map").into_response()
        }
    }
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BudgetParams>,
) -> Json<Frame> {
    let frame = tokio::task::block_in_place(|| {
        let mut shell = lock_shell(&state);
        run(&mut shell, params.budget)
    });
    Json(frame)
}

async fn reload_handler(State(state): State<Arc<AppState>>) -> Json<ReloadResponse> {
    lock_shell(&state).reload();
    Json(ReloadResponse { reloaded: true })
}

fn run(shell: &mut Shell, budget: Option<u64>) -> Frame {
    match budget {
        Some(b) => shell.set_budget(b),
        None => shell.render_current(),
    }
}

fn lock_shell(state: &AppState) -> std::sync::MutexGuard<'_, Shell> {
    state.shell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web UI and HTTP API for the triage inbox

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::history::HistoryEntry;
use crate::inbox::{Inbox, StagedFile};
use crate::subfolder::{targets, ShortcutTarget};
use crate::TriageError;

/// Shared application state
pub struct AppState {
    pub inbox: Inbox,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inbox: Inbox::from_config(&config),
            config,
        }
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.web.max_upload_bytes;
    Router::new()
        // Pages
        .route("/", get(inbox_page))
        .route("/inbox", get(inbox_page))
        .route("/history", get(history_page))
        // API endpoints
        .route("/api/inbox", get(api_list))
        .route("/api/inbox/upload", post(api_upload))
        .route("/api/inbox/move", post(api_move))
        .route("/api/shortcuts", get(api_shortcuts))
        .route("/api/history", get(api_history))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Errors ===

/// `{ "error": "..." }` with a status derived from the failure
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        let status = match &err {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            TriageError::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_conflict() => StatusCode::CONFLICT,
            TriageError::Upload(_) => StatusCode::BAD_REQUEST,
            // A broken or oversized request body surfaces as an io error from the stream
            TriageError::Io(io) => io
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<axum::extract::multipart::MultipartError>())
                .map(|m| m.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            debug!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

// === Page Handlers ===

async fn inbox_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let files = state.inbox.list_staged().await;
    let shortcuts = targets(&state.config.shortcuts, Utc::now().date_naive());
    Html(render_inbox_page(&files, &shortcuts))
}

async fn history_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let entries = recent_history(&state, 100).await;
    Html(render_history_page(&entries))
}

// === API Handlers ===

async fn api_list(State(state): State<Arc<AppState>>) -> Json<Vec<StagedFile>> {
    Json(state.inbox.list_staged().await)
}

async fn api_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StagedFile>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| TriageError::Upload("file field has no filename".to_string()))?;

        let body = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(body);
        let staged = state.inbox.receive_upload(&name, body).await?;
        return Ok((StatusCode::CREATED, Json(staged)));
    }
    Err(TriageError::Upload("No file provided".to_string()).into())
}

#[derive(Deserialize)]
struct MoveRequest {
    name: String,
    /// Kept as a string so unknown values become `InvalidCategory`
    category: String,
    #[serde(default)]
    subfolder: Option<String>,
}

#[derive(Serialize)]
struct MoveResponse {
    name: String,
    destination: String,
}

async fn api_move(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<MoveResponse>, ApiError> {
    let Json(req) = payload?;
    let dest = state
        .inbox
        .move_staged(&req.name, &req.category, req.subfolder.as_deref())
        .await?;
    Ok(Json(MoveResponse {
        name: dest.name.clone(),
        destination: dest.relative(),
    }))
}

#[derive(Deserialize)]
struct ShortcutsQuery {
    date: Option<NaiveDate>,
}

async fn api_shortcuts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShortcutsQuery>,
) -> Json<Vec<ShortcutTarget>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Json(targets(&state.config.shortcuts, date))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn api_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HistoryEntry>> {
    Json(recent_history(&state, query.limit.unwrap_or(50)).await)
}

async fn recent_history(state: &AppState, limit: usize) -> Vec<HistoryEntry> {
    match state.inbox.history() {
        Some(history) => history.get_recent(limit).await.unwrap_or_default(),
        None => Vec::new(),
    }
}

// === Template Rendering ===

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn base_template(title: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Inbox Triage</title>
    <style>
        :root {{
            --bg-primary: #1a1a2e;
            --bg-secondary: #16213e;
            --bg-card: #0f3460;
            --text-primary: #e8e8e8;
            --text-secondary: #a0a0a0;
            --accent: #e94560;
            --border: #2a2a4a;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 20px; }}
        nav {{
            background: var(--bg-secondary);
            padding: 15px 20px;
            display: flex;
            align-items: center;
            gap: 30px;
            border-bottom: 1px solid var(--border);
        }}
        nav .logo {{ font-size: 1.5em; font-weight: bold; color: var(--accent); text-decoration: none; }}
        nav a {{ color: var(--text-secondary); text-decoration: none; }}
        nav a:hover {{ color: var(--text-primary); }}
        .card {{ background: var(--bg-card); border-radius: 12px; padding: 20px; margin-bottom: 20px; }}
        .muted {{ color: var(--text-secondary); font-size: 0.9em; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid var(--border); vertical-align: top; }}
        th {{ color: var(--text-secondary); font-weight: 500; }}
        input, select, button {{
            background: var(--bg-secondary);
            color: var(--text-primary);
            border: 1px solid var(--border);
            border-radius: 6px;
            padding: 4px 10px;
        }}
        .chip {{ border-radius: 999px; font-size: 0.8em; margin: 4px 4px 0 0; }}
    </style>
</head>
<body>
    <nav>
        <a href="/" class="logo">Inbox Triage</a>
        <a href="/inbox">Inbox</a>
        <a href="/history">History</a>
    </nav>
    <main class="container">
        {}
    </main>
</body>
</html>"#, escape_html(title), content)
}

fn render_move_controls(file: &StagedFile, shortcuts: &[ShortcutTarget]) -> String {
    let name = escape_html(&file.name);
    let chips: String = shortcuts
        .iter()
        .map(|s| {
            format!(
                r#"<button type="button" class="chip" data-name="{}" data-category="{}" data-subfolder="{}">{}</button>"#,
                name,
                s.category,
                escape_html(s.subfolder.as_deref().unwrap_or("")),
                escape_html(&s.label),
            )
        })
        .collect();

    format!(r#"
        <form class="move-form" data-name="{}">
            <select name="category" aria-label="Category">
                <option value="orders">orders</option>
                <option value="coas">coas</option>
                <option value="notes">notes</option>
            </select>
            <input name="subfolder" placeholder="subfolder (optional)" aria-label="Subfolder">
            <button type="submit">Move</button>
        </form>
        <div>{}</div>
    "#, name, chips)
}

fn render_inbox_page(files: &[StagedFile], shortcuts: &[ShortcutTarget]) -> String {
    let table = if files.is_empty() {
        r#"<p class="muted">No files in inbox yet.</p>"#.to_string()
    } else {
        let rows: String = files
            .iter()
            .map(|f| {
                format!(
                    r#"<tr><td>{}</td><td>{} B</td><td>{}</td><td>{}</td></tr>"#,
                    escape_html(&f.name),
                    f.size_bytes,
                    f.modified_at.format("%Y-%m-%d %H:%M:%S"),
                    render_move_controls(f, shortcuts),
                )
            })
            .collect();
        format!(r#"
            <table>
                <tr><th>File</th><th>Size</th><th>When</th><th>Move</th></tr>
                {}
            </table>
        "#, rows)
    };

    let content = format!(r#"
        <h1>Inbox</h1>
        <div class="card">
            <p class="muted">Upload and move files from here.</p>
            <form id="upload-form">
                <input type="file" name="file" required>
                <button type="submit">Upload</button>
            </form>
        </div>
        <div class="card">
            {}
        </div>
        <script>
        async function send(url, init) {{
            const res = await fetch(url, init);
            if (!res.ok) {{
                const j = await res.json().catch(() => null);
                alert(j && j.error ? j.error : 'Request failed');
                return;
            }}
            location.reload();
        }}
        function move(name, category, subfolder) {{
            return send('/api/inbox/move', {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ name, category, subfolder: subfolder.trim() }}),
            }});
        }}
        document.getElementById('upload-form').addEventListener('submit', (e) => {{
            e.preventDefault();
            send('/api/inbox/upload', {{ method: 'POST', body: new FormData(e.target) }});
        }});
        document.querySelectorAll('.move-form').forEach((form) => {{
            form.addEventListener('submit', (e) => {{
                e.preventDefault();
                move(form.dataset.name, form.category.value, form.subfolder.value);
            }});
        }});
        document.querySelectorAll('.chip').forEach((chip) => {{
            chip.addEventListener('click', () => {{
                chip.disabled = true;
                move(chip.dataset.name, chip.dataset.category, chip.dataset.subfolder);
            }});
        }});
        </script>
    "#, table);

    base_template("Inbox", &content)
}

fn render_history_page(entries: &[HistoryEntry]) -> String {
    let rows: String = entries
        .iter()
        .map(|e| {
            format!(
                r#"<tr><td>{}</td><td>{:?}</td><td>{}</td><td>{}</td><td>{} B</td></tr>"#,
                e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                e.action,
                escape_html(&e.name),
                escape_html(&e.path),
                e.size_bytes,
            )
        })
        .collect();

    let content = format!(r#"
        <h1>History</h1>
        <div class="card">
            {}
        </div>
    "#, if rows.is_empty() {
        r#"<p class="muted">Nothing has been triaged yet.</p>"#.to_string()
    } else {
        format!(r#"<table>
                <tr><th>When</th><th>Action</th><th>File</th><th>Location</th><th>Size</th></tr>
                {}
            </table>"#, rows)
    });

    base_template("History", &content)
}

/// Start the web server with config
pub async fn start_server(config: AppConfig) -> crate::Result<()> {
    let state = Arc::new(AppState::new(config.clone()));
    state.inbox.init().await?;

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web UI available at http://{}", addr);
    info!("Storage root: {:?} (collision policy: {:?})", state.inbox.root(), state.inbox.policy());

    let router = create_router(state);
    axum::serve(listener, router).await
        .map_err(|e| crate::TriageError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

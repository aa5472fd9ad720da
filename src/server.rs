//! Web server for the quakecast dashboard.
//!
//! Provides two views using:
//! - Axum for HTTP server
//! - Chart.js for the dataset exploration charts
//! - Leaflet for the prediction map
//!
//! Each browser gets its own prediction session, keyed by a cookie.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use uuid::Uuid;

use crate::errors::QuakecastError;
use crate::explorer::{Dataset, ExplorerReport};
use crate::models::{EventStatus, LastPrediction, MagType, PredictionForm};
use crate::session::{EXPORT_FILE_NAME, Session};
use crate::workflow::PredictionWorkflow;

/// Name of the session cookie.
const SESSION_COOKIE: &str = "quakecast_session";

/// Sessions idle for longer than this are discarded.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub dataset: PathBuf,
    pub session_idle_timeout: Duration,
}

/// One session's state. Held across the blocking prediction task, so it is
/// an async lock.
type SharedSession = Arc<tokio::sync::Mutex<Session>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Per-browser prediction sessions.
///
/// The map only routes a request to its own session; sessions never see
/// each other's state. Sessions are created on the first prediction and
/// dropped once idle for longer than the timeout.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    idle_timeout: Duration,
}

/// The session a request belongs to.
struct SessionHandle {
    id: Uuid,
    session: SharedSession,
    is_new: bool,
}

impl SessionHandle {
    /// Attach the session cookie to a response for newly created sessions.
    fn apply(&self, mut response: Response) -> Response {
        if self.is_new {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
        }
        response
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) < self.idle_timeout);

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "idle sessions discarded");
        }
    }

    /// The caller's live session, if its cookie names one. Never creates a session.
    fn find(&self, headers: &HeaderMap) -> Option<SessionHandle> {
        let id = session_id(headers)?;
        let mut sessions = lock(&self.sessions);
        let now = Instant::now();
        self.evict_idle(&mut sessions, now);

        let entry = sessions.get_mut(&id)?;
        entry.last_seen = now;
        Some(SessionHandle {
            id,
            session: Arc::clone(&entry.session),
            is_new: false,
        })
    }

    /// Find the caller's session, creating one if the cookie is absent or stale.
    fn resolve(&self, headers: &HeaderMap) -> SessionHandle {
        if let Some(handle) = self.find(headers) {
            return handle;
        }

        let id = Uuid::new_v4();
        let session = Arc::new(tokio::sync::Mutex::new(Session::new()));
        lock(&self.sessions).insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(session = %id, "session started");

        SessionHandle {
            id,
            session,
            is_new: true,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.sessions).len()
    }
}

/// Read the session id from the request cookies.
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    workflow: PredictionWorkflow,
    sessions: SessionStore,
    dataset: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(workflow: PredictionWorkflow, dataset: PathBuf, sessions: SessionStore) -> Self {
        Self {
            workflow,
            sessions,
            dataset,
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/explore") }))
        .route("/explore", get(explore_handler))
        .route("/api/explore", get(explore_api_handler))
        .route("/predict", get(predict_page_handler).post(predict_submit_handler))
        .route("/predict/export.csv", get(export_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
pub async fn run_server(config: ServerConfig, workflow: PredictionWorkflow) -> anyhow::Result<()> {
    let sessions = SessionStore::new(config.session_idle_timeout);
    let state = AppState::new(workflow, config.dataset.clone(), sessions);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🌍 quakecast dashboard starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Load the dataset off the async runtime and compute its views.
async fn load_report(state: &AppState) -> Result<ExplorerReport, String> {
    let path = state.dataset.clone();
    let loaded =
        tokio::task::spawn_blocking(move || Dataset::load(&path).map(|d| d.explore())).await;

    match loaded {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(e)) => {
            tracing::error!("dataset load failed: {}", e);
            Err(e.to_string())
        }
        Err(e) => {
            tracing::error!("dataset task failed: {}", e);
            Err("internal error".to_string())
        }
    }
}

/// Exploration view.
async fn explore_handler(State(state): State<AppState>) -> Response {
    match load_report(&state).await {
        Ok(report) => Html(render_explore_page(&report)).into_response(),
        Err(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(page(
                "Exploration",
                Nav::Explore,
                &format!(r#"<div class="notice notice-error">✕ {}</div>"#, escape_html(&message)),
            )),
        )
            .into_response(),
    }
}

/// Exploration views as JSON.
async fn explore_api_handler(State(state): State<AppState>) -> Response {
    match load_report(&state).await {
        Ok(report) => Json(report).into_response(),
        Err(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response(),
    }
}

/// Prediction view.
async fn predict_page_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (last, rows) = match state.sessions.find(&headers) {
        Some(handle) => {
            let session = handle.session.lock().await;
            (session.last_prediction().cloned(), session.history().len())
        }
        None => (None, 0),
    };

    Html(render_predict_page(&default_form(), last.as_ref(), rows, None)).into_response()
}

/// Prediction form submission.
async fn predict_submit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PredictionForm>,
) -> Response {
    let handle = state.sessions.resolve(&headers);
    let workflow = state.workflow.clone();
    let submitted = form.clone();

    // Model loading and geocoding block; the session lock serializes
    // actions within one session.
    let guard = Arc::clone(&handle.session).lock_owned().await;
    let joined = tokio::task::spawn_blocking(move || {
        let mut session = guard;
        let outcome = workflow.submit(&mut session, form).map(|_| ());
        (outcome, session.last_prediction().cloned(), session.history().len())
    })
    .await;

    let (status, body) = match joined {
        Ok((outcome, last, rows)) => {
            let (status, notice) = match outcome {
                Ok(()) => {
                    let magnitude = last
                        .as_ref()
                        .map(LastPrediction::formatted_magnitude)
                        .unwrap_or_default();
                    let notice = Notice::Success(format!("Predicted magnitude: {magnitude}"));
                    (StatusCode::OK, notice)
                }
                Err(e) => {
                    tracing::warn!(session = %handle.id, "prediction failed: {}", e);
                    (error_status(&e), Notice::Error(e.to_string()))
                }
            };
            (status, render_predict_page(&submitted, last.as_ref(), rows, Some(&notice)))
        }
        Err(e) => {
            tracing::error!("prediction task failed: {}", e);
            let notice = Notice::Error("internal error".into());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                render_predict_page(&submitted, None, 0, Some(&notice)),
            )
        }
    };

    handle.apply((status, Html(body)).into_response())
}

fn error_status(error: &QuakecastError) -> StatusCode {
    if error.is_input_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Session history download.
async fn export_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let exported = match state.sessions.find(&headers) {
        Some(handle) => {
            let session = handle.session.lock().await;
            if session.history().is_empty() {
                None
            } else {
                Some(session.export_history())
            }
        }
        None => None,
    };

    match exported {
        None => (StatusCode::NOT_FOUND, "No predictions in this session").into_response(),
        Some(Ok(csv)) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
                ),
            ],
            csv,
        )
            .into_response(),
        Some(Err(e)) => {
            tracing::error!("history export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Export failed").into_response()
        }
    }
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// Rendering
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nav {
    Explore,
    Predict,
}

enum Notice {
    Success(String),
    Error(String),
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that is safe to embed inside a `<script>` element.
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}

fn page(title: &str, active: Nav, body: &str) -> String {
    let nav_class = |nav: Nav| if nav == active { "nav-link active" } else { "nav-link" };

    let mut html = String::from(PAGE_HEAD);
    let _ = write!(
        html,
        r#"<title>{title} · quakecast</title>
</head>
<body>
<header class="header">
  <div class="header-inner">
    <a href="/" class="logo">🌍 <span>quakecast</span></a>
    <nav>
      <a class="{explore}" href="/explore">Exploration</a>
      <a class="{predict}" href="/predict">Prediction</a>
    </nav>
  </div>
</header>
<main class="main">
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        explore = nav_class(Nav::Explore),
        predict = nav_class(Nav::Predict),
    );
    html
}

fn render_explore_page(report: &ExplorerReport) -> String {
    let section = |id: &str, title: &str, available: bool| {
        let content = if available {
            format!(r#"<canvas id="{id}"></canvas>"#)
        } else {
            r#"<p class="muted">Required columns are not in the dataset.</p>"#.to_string()
        };
        format!(r#"<section class="card"><h2>{title}</h2>{content}</section>"#)
    };

    let mut body = format!(
        r#"<h1 class="section-title">Earthquake Data Analysis</h1>
<p class="section-subtitle">{} events in the historical dataset</p>
"#,
        report.rows
    );
    body.push_str(&render_preview(report));

    let views = [
        ("monthly", "1. Events per month", report.monthly_counts.is_some()),
        ("locations", "2. Most frequent locations", report.top_locations.is_some()),
        ("stations", "3. Stations (nst) vs magnitude", report.stations_vs_magnitude.is_some()),
        ("categories", "4. Events per magnitude category", report.magnitude_categories.is_some()),
        ("depth", "5. Depth vs magnitude", report.depth_vs_magnitude.is_some()),
    ];
    body.push_str(r#"<div class="grid">"#);
    for (id, title, available) in views {
        body.push_str(&section(id, title, available));
    }
    body.push_str("</div>\n");

    let _ = write!(
        body,
        "<script>const report = {};\n{EXPLORE_SCRIPT}</script>",
        script_json(report)
    );

    page("Exploration", Nav::Explore, &body)
}

/// Leading dataset rows followed by the column descriptions.
fn render_preview(report: &ExplorerReport) -> String {
    let preview = &report.preview;
    let mut html = format!(
        r#"<section class="card">
<h2>Dataset</h2>
<p class="muted">First {} of {} rows</p>
<div class="table-wrap"><table><thead><tr>"#,
        preview.rows.len(),
        report.rows
    );
    for column in &preview.columns {
        let _ = write!(html, "<th>{}</th>", escape_html(&column.name));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &preview.rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape_html(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>\n<h2>Columns</h2>\n<table class=\"glossary\"><tbody>");
    for column in &preview.columns {
        let _ = write!(
            html,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(&column.name),
            column.description.map_or_else(|| "-".to_string(), escape_html)
        );
    }
    html.push_str("</tbody></table>\n</section>\n");
    html
}

/// Form values shown before the first submission.
fn default_form() -> PredictionForm {
    PredictionForm {
        mag_type: MagType::default().as_str().to_string(),
        status: EventStatus::default().as_str().to_string(),
        location_source: "us".into(),
        mag_source: "us".into(),
        event_type: "earthquake".into(),
        net: "us".into(),
        ..Default::default()
    }
}

fn render_form(form: &PredictionForm) -> String {
    let text = |name: &str, label: &str, value: &str, placeholder: &str| {
        format!(
            r#"<label>{label}<input type="text" name="{name}" value="{}" placeholder="{placeholder}"></label>"#,
            escape_html(value)
        )
    };
    let number = |name: &str, label: &str, value: &str, placeholder: &str| {
        format!(
            r#"<label>{label}<input type="text" inputmode="decimal" name="{name}" value="{}" placeholder="{placeholder}"></label>"#,
            escape_html(value)
        )
    };
    let select = |name: &str, label: &str, options: &[&str], selected: &str| {
        let opts: String = options
            .iter()
            .map(|o| {
                let sel = if *o == selected { " selected" } else { "" };
                format!(r#"<option value="{o}"{sel}>{o}</option>"#)
            })
            .collect();
        format!(r#"<label>{label}<select name="{name}">{opts}</select></label>"#)
    };

    let fields = [
        text("Date", "Date (YYYY-MM-DD)", &form.date, "2025-08-09"),
        text("time", "Time (HH:MM:SS)", &form.time, "14:23:00"),
        number("latitude", "Latitude", &form.latitude, "-8.650000"),
        number("longitude", "Longitude", &form.longitude, "115.220000"),
        number("depth", "Depth (km)", &form.depth, "10.2"),
        select("magType", "Magnitude type", &MagType::ALL.map(MagType::as_str), &form.mag_type),
        number("nst", "Stations (nst)", &form.nst, "40"),
        number("gap", "Gap", &form.gap, "65"),
        number("dmin", "Dmin", &form.dmin, "0.35"),
        number("rms", "RMS", &form.rms, "0.82"),
        number("horizontalError", "Horizontal error", &form.horizontal_error, "0.7"),
        number("depthError", "Depth error", &form.depth_error, "0.5"),
        number("magError", "Magnitude error", &form.mag_error, "0.05"),
        number("magNst", "Magnitude stations", &form.mag_nst, "40"),
        select("status", "Status", &EventStatus::ALL.map(EventStatus::as_str), &form.status),
        text("locationSource", "Location source", &form.location_source, "us"),
        text("magSource", "Magnitude source", &form.mag_source, "us"),
        text("type", "Event type", &form.event_type, "earthquake"),
        text(
            "location",
            "Location (optional)",
            &form.location,
            "Leave empty to resolve from coordinates",
        ),
        text("net", "Net", &form.net, "us"),
        text("id", "ID", &form.id, "us1234567"),
    ];

    format!(
        r#"<form class="card form-grid" method="post" action="/predict">
{}
<button class="btn btn-primary" type="submit">Predict magnitude</button>
</form>"#,
        fields.join("\n")
    )
}

fn render_result(last: &LastPrediction, rows: usize) -> String {
    let magnitude = last.formatted_magnitude();
    let mut html = format!(
        r#"<section class="card result">
<div class="result-mag">M{magnitude}</div>
<div class="muted">{location}</div>"#,
        location = escape_html(&last.record.location),
    );

    match last.coordinates {
        Some((lat, lon)) => {
            let _ = write!(
                html,
                r#"<div id="map" class="map"></div>
<script>
(function() {{
  var map = L.map('map').setView([{lat}, {lon}], 6);
  L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
    attribution: '&copy; OpenStreetMap contributors'
  }}).addTo(map);
  L.marker([{lat}, {lon}]).addTo(map)
    .bindPopup('Predicted magnitude: {magnitude}').openPopup();
}})();
</script>"#
            );
        }
        None => html.push_str(r#"<p class="muted">No coordinates to map.</p>"#),
    }

    let _ = write!(
        html,
        r#"<a class="btn" href="/predict/export.csv" download="{EXPORT_FILE_NAME}">⬇ Download predictions (CSV, {rows} rows)</a>
</section>"#
    );
    html
}

fn render_predict_page(
    form: &PredictionForm,
    last: Option<&LastPrediction>,
    rows: usize,
    notice: Option<&Notice>,
) -> String {
    let mut body = String::from(
        r#"<h1 class="section-title">Earthquake Magnitude Prediction</h1>
<p class="section-subtitle">Enter the event attributes; blank numeric fields are treated as missing.</p>
"#,
    );

    match notice {
        Some(Notice::Success(message)) => {
            let message = escape_html(message);
            let _ = write!(body, r#"<div class="notice notice-success">✓ {message}</div>"#);
        }
        Some(Notice::Error(message)) => {
            let message = escape_html(message);
            let _ = write!(body, r#"<div class="notice notice-error">✕ {message}</div>"#);
        }
        None => {}
    }

    body.push_str(r#"<div class="grid">"#);
    body.push_str(&render_form(form));
    if let Some(last) = last {
        body.push_str(&render_result(last, rows));
    }
    body.push_str("</div>");

    page("Prediction", Nav::Predict, &body)
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">

    <!-- Leaflet -->
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>

    <!-- Chart.js -->
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js"></script>

    <style>
        :root {
            --font: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;
            --bg-primary: #09090b;
            --bg-elevated: #1c1c1f;
            --text-primary: #fafafa;
            --text-secondary: #a1a1aa;
            --border: #27272a;
            --accent: #818cf8;
            --success: #10b981;
            --danger: #ef4444;
            --radius-md: 10px;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: var(--font);
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }

        .header { border-bottom: 1px solid var(--border); }
        .header-inner {
            max-width: 1400px; margin: 0 auto; padding: 0.875rem 1.5rem;
            display: flex; justify-content: space-between; align-items: center;
        }
        .logo { color: var(--text-primary); text-decoration: none; font-weight: 600; }
        .nav-link { color: var(--text-secondary); text-decoration: none; margin-left: 1rem; }
        .nav-link.active { color: var(--accent); }

        .main { max-width: 1400px; margin: 0 auto; padding: 1.5rem; }
        .section-title { font-size: 1.5rem; }
        .section-subtitle { color: var(--text-secondary); margin-bottom: 1rem; }

        .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(480px, 1fr)); gap: 1rem; }
        .card {
            background: var(--bg-elevated); border: 1px solid var(--border);
            border-radius: var(--radius-md); padding: 1rem;
        }
        .card h2 { font-size: 1rem; margin-bottom: 0.5rem; }

        .form-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 0.5rem 1rem; }
        .form-grid label { display: flex; flex-direction: column; font-size: 0.8rem; color: var(--text-secondary); }
        .form-grid input, .form-grid select {
            background: var(--bg-primary); color: var(--text-primary);
            border: 1px solid var(--border); border-radius: 6px; padding: 0.4rem;
        }

        .btn {
            display: inline-block; margin-top: 0.75rem; padding: 0.5rem 1rem;
            border-radius: 6px; border: 1px solid var(--border);
            color: var(--text-primary); background: transparent; text-decoration: none; cursor: pointer;
        }
        .btn-primary { background: var(--accent); border-color: var(--accent); color: #09090b; }

        .notice { padding: 0.75rem 1rem; border-radius: var(--radius-md); margin-bottom: 1rem; }
        .notice-success { border: 1px solid var(--success); color: var(--success); }
        .notice-error { border: 1px solid var(--danger); color: var(--danger); }

        .result-mag { font-size: 2.5rem; font-weight: 700; color: var(--accent); }
        .map { height: 500px; border-radius: var(--radius-md); margin-top: 0.75rem; }
        .muted { color: var(--text-secondary); }

        .table-wrap { overflow: auto; max-height: 420px; margin-bottom: 1rem; }
        table { border-collapse: collapse; font-size: 0.8rem; width: 100%; }
        th, td { padding: 0.3rem 0.6rem; border-bottom: 1px solid var(--border); text-align: left; white-space: nowrap; }
        thead th { position: sticky; top: 0; background: var(--bg-elevated); }
        .glossary td { white-space: normal; color: var(--text-secondary); }
    </style>
"#;

const EXPLORE_SCRIPT: &str = r"
Chart.defaults.color = '#a1a1aa';

function draw(id, config) {
  var el = document.getElementById(id);
  if (el) { new Chart(el, config); }
}

function trend(rel) {
  if (!rel.fit) { return []; }
  var xs = rel.points.map(function(p) { return p[0]; });
  var lo = Math.min.apply(null, xs), hi = Math.max.apply(null, xs);
  return [
    { x: lo, y: rel.fit.intercept + rel.fit.slope * lo },
    { x: hi, y: rel.fit.intercept + rel.fit.slope * hi }
  ];
}

function scatter(id, rel, xLabel) {
  if (!rel) { return; }
  var r = rel.fit && rel.fit.correlation !== null ? ' (r = ' + rel.fit.correlation.toFixed(3) + ')' : '';
  draw(id, {
    type: 'scatter',
    data: { datasets: [
      { label: rel.y_column + ' vs ' + rel.x_column + r,
        data: rel.points.map(function(p) { return { x: p[0], y: p[1] }; }),
        backgroundColor: 'rgba(129, 140, 248, 0.6)' },
      { label: 'trend', type: 'line', data: trend(rel), borderColor: '#ef4444', pointRadius: 0 }
    ] },
    options: { scales: { x: { title: { display: true, text: xLabel } },
                         y: { title: { display: true, text: 'Magnitude' } } } }
  });
}

if (report.monthly_counts) {
  draw('monthly', {
    type: 'line',
    data: { labels: report.monthly_counts.map(function(m) { return m.month; }),
            datasets: [{ label: 'Events', data: report.monthly_counts.map(function(m) { return m.count; }),
                         borderColor: '#818cf8' }] }
  });
}

if (report.top_locations) {
  draw('locations', {
    type: 'bar',
    data: { labels: report.top_locations.map(function(l) { return l.location; }),
            datasets: [{ label: 'Events', data: report.top_locations.map(function(l) { return l.count; }),
                         backgroundColor: '#10b981' }] },
    options: { indexAxis: 'y' }
  });
}

scatter('stations', report.stations_vs_magnitude, 'Stations (nst)');

if (report.magnitude_categories) {
  draw('categories', {
    type: 'bar',
    data: { labels: report.magnitude_categories.map(function(c) { return c.category; }),
            datasets: [{ label: 'Events', data: report.magnitude_categories.map(function(c) { return c.count; }),
                         backgroundColor: '#f59e0b' }] },
    options: { indexAxis: 'y' }
  });
}

scatter('depth', report.depth_vs_magnitude, 'Depth (km)');
";

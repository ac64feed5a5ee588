//! Embedded web dashboard for clusterboard.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page dashboard: cluster table, map, stats and timeline
//! - JSON API endpoints backed by the same [`Dashboard`] the CLI uses
//!
//! Launched via `clusterboard web` (default: `http://127.0.0.1:7878`).
//!
//! Requests are handled sequentially on the server thread. Backend refreshes
//! run on a worker thread and write back through the dashboard's fetch
//! tokens, so a slow refresh never blocks the table and a superseded one is
//! dropped.

mod api;
mod frontend;

use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use anyhow::{Context, Result};
use colored::Colorize;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::analytics::logger::FetchLog;
use crate::backend::{self, BackendClient, Session};
use crate::config::DashboardConfig;
use crate::config::schema::ViewConfig;
use crate::dashboard::Dashboard;
use crate::store::{FetchToken, LoadOutcome};

pub(crate) type HttpResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything request handlers share.
///
/// The dashboard sits behind a mutex because refresh workers write to it;
/// the session is resolved once at startup and never changes.
#[derive(Debug, Clone)]
pub struct WebState {
    dashboard: Arc<Mutex<Dashboard>>,
    client: BackendClient,
    session: Option<Session>,
    view: ViewConfig,
}

impl WebState {
    pub fn new(client: BackendClient, session: Option<Session>, view: ViewConfig) -> Self {
        let dashboard = Dashboard::new(view.items_per_page, view.sort_state());
        Self {
            dashboard: Arc::new(Mutex::new(dashboard)),
            client,
            session,
            view,
        }
    }

    pub(crate) fn dashboard(&self) -> Result<MutexGuard<'_, Dashboard>> {
        self.dashboard
            .lock()
            .map_err(|_| anyhow::anyhow!("dashboard state is poisoned"))
    }

    pub(crate) fn client(&self) -> &BackendClient {
        &self.client
    }

    /// `None` when the backend rejected the session at startup.
    pub(crate) fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn view_config(&self) -> &ViewConfig {
        &self.view
    }

    /// Start a snapshot fetch on a worker thread and return its token.
    ///
    /// The result is applied only if no later refresh started in the
    /// meantime; a failed fetch keeps the previous snapshot.
    pub fn spawn_refresh(&self) -> Result<FetchToken> {
        let token = self.dashboard()?.begin_fetch();
        let dashboard = Arc::clone(&self.dashboard);
        let client = self.client.clone();

        thread::spawn(move || {
            let result = client.fetch_snapshot(true);
            let Ok(mut dash) = dashboard.lock() else {
                return;
            };
            match dash.complete_fetch(token, result) {
                LoadOutcome::Applied {
                    clusters,
                    duplicates_dropped,
                    records_skipped,
                    ..
                } => {
                    if duplicates_dropped > 0 {
                        eprintln!(
                            "{} refresh #{}: dropped {} cluster(s) with duplicate ids",
                            "warning:".yellow().bold(),
                            token.value(),
                            duplicates_dropped
                        );
                    }
                    if records_skipped > 0 {
                        eprintln!(
                            "{} refresh #{}: skipped {} undecodable record(s)",
                            "warning:".yellow().bold(),
                            token.value(),
                            records_skipped
                        );
                    }
                    println!(
                        "{}",
                        format!("refresh #{} loaded {} clusters", token.value(), clusters).dimmed()
                    );
                }
                LoadOutcome::Failed => {
                    let error = dash.status().error.unwrap_or_default();
                    eprintln!(
                        "{} refresh #{} failed: {}",
                        "warning:".yellow().bold(),
                        token.value(),
                        error
                    );
                }
                LoadOutcome::Stale => {}
            }
        });

        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard server.
///
/// `addr` overrides `web.addr` from config. Blocks the current thread.
/// Per-request errors become JSON error responses; nothing a request does
/// stops the server.
pub fn serve(cfg: &DashboardConfig, addr: Option<&str>) -> Result<()> {
    let addr = addr.unwrap_or(&cfg.web.addr);
    let client = BackendClient::from_config(&cfg.backend, FetchLog::from_config(&cfg.logging))?;

    let session = match client.session() {
        Ok(session) => Some(session),
        Err(err) => {
            match backend::error::login_url(&err) {
                Some(url) => eprintln!(
                    "{} not logged in; log in at {}",
                    "warning:".yellow().bold(),
                    url
                ),
                None => eprintln!(
                    "{} could not resolve session: {err:#}",
                    "warning:".yellow().bold()
                ),
            }
            None
        }
    };

    let state = WebState::new(client, session, cfg.dashboard.clone());
    state.spawn_refresh()?;

    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("clusterboard dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    if cfg.web.open_browser
        && let Err(err) = open_browser(&format!("http://{addr}"))
    {
        println!("{}", browser_hint(addr, &err).dimmed());
    }

    for request in server.incoming_requests() {
        handle(&state, request);
    }

    Ok(())
}

fn handle(state: &WebState, request: tiny_http::Request) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let resp = dispatch(state, &method, &url).unwrap_or_else(|err| error_response(&err));
    let status = resp.status_code().0;
    let _ = request.respond(resp);

    // Brief access log
    println!(
        "{} {} {} {}",
        chrono::Local::now().format("%H:%M:%S"),
        method,
        url,
        status
    );
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub(crate) fn dispatch(state: &WebState, method: &Method, url: &str) -> Result<HttpResponse> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API — Table
        (&Method::Get, "/api/table") => api::get_table(state, url),
        (&Method::Post, "/api/select") => api::post_select(state, url),

        // API — Derived views
        (&Method::Get, "/api/stats") => api::get_stats(state, url),
        (&Method::Get, "/api/gaps") => api::get_gaps(state, url),
        (&Method::Get, "/api/timeline") => api::get_timeline(state, url),
        (&Method::Get, "/api/suggestions") => api::get_suggestions(state, url),
        (&Method::Get, "/api/map") => api::get_map(state),

        // API — Session and data lifecycle
        (&Method::Get, "/api/session") => api::get_session(state),
        (&Method::Get, "/api/status") => api::get_status(state),
        (&Method::Post, "/api/refresh") => api::post_refresh(state),
        (&Method::Post, "/api/trigger-pipeline") => api::post_trigger_pipeline(state),

        // 404
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Serve the embedded single-page frontend.
fn serve_frontend() -> HttpResponse {
    let html = frontend::INDEX_HTML;
    Response::from_data(html.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// 404 response.
fn not_found() -> HttpResponse {
    json_status(404, &serde_json::json!({ "error": "not found" }))
}

/// Map a handler error onto a status code. Authentication failures carry
/// the login URL so the frontend can link to it.
fn error_response(err: &anyhow::Error) -> HttpResponse {
    if let Some(login_url) = backend::error::login_url(err) {
        return json_status(
            401,
            &serde_json::json!({ "error": "authentication required", "login_url": login_url }),
        );
    }
    if backend::error::is_forbidden(err) {
        return json_status(403, &serde_json::json!({ "error": err.to_string() }));
    }
    json_status(500, &serde_json::json!({ "error": format!("{err:#}") }))
}

/// JSON body with an explicit status.
pub(crate) fn json_status(code: u16, body: &serde_json::Value) -> HttpResponse {
    Response::from_data(body.to_string().into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(code))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header is valid")
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8")
        .expect("static header is valid")
}

/// Shown when the browser could not be launched.
fn browser_hint(addr: &str, err: &anyhow::Error) -> String {
    format!("could not open a browser ({err:#}); visit http://{addr} manually")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Embedded web dashboard for metrix.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page dashboard with a settings form
//! - JSON API endpoints for the current snapshot, refresh, settings,
//!   insights and fetch history
//!
//! A background poller refreshes the snapshot every [`POLL_INTERVAL`].
//! Launched via `metrix web` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::config::ConfigStore;
use crate::config::schema::InsightConfig;
use crate::refresh::{Dashboard, POLL_INTERVAL, spawn_poller};
use crate::source::Transport;

/// Everything the request handlers need.
pub struct WebContext {
    pub dashboard: Dashboard,
    pub insight: InsightConfig,
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard on `addr` and poll the data source until the
/// process is stopped.
pub fn serve(
    addr: &str,
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn Transport>,
    insight: InsightConfig,
    log_events: bool,
) -> Result<()> {
    let server =
        Server::http(addr).map_err(|e| anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    let dashboard = if log_events {
        Dashboard::with_event_log(store, transport)
    } else {
        Dashboard::new(store, transport)
    };
    let _poller = spawn_poller(dashboard.clone(), POLL_INTERVAL);
    let ctx = Arc::new(WebContext { dashboard, insight });

    println!("metrix dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    run(server, ctx);
    Ok(())
}

/// Accept requests until the server shuts down.
///
/// Each request gets its own thread, so a refresh stuck on an unresponsive
/// data source never blocks the snapshot or settings endpoints.
fn run(server: Server, ctx: Arc<WebContext>) {
    for request in server.incoming_requests() {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || handle(&ctx, request));
    }
}

fn handle(ctx: &WebContext, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let response = match read_body(&mut request, &method) {
        Ok(body) => dispatch(ctx, &method, &url, body.as_deref())
            .unwrap_or_else(|e| error_response(&e, StatusCode(500))),
        Err(e) => error_response(&e, StatusCode(400)),
    };
    let status = response.status_code().0;
    let _ = request.respond(response);

    println!(
        "{} {} {} {}",
        chrono::Local::now().format("%H:%M:%S"),
        method,
        url.split('?').next().unwrap_or(&url),
        status
    );
}

/// The request body for PUT and POST; `None` for other methods.
fn read_body(request: &mut Request, method: &Method) -> Result<Option<String>> {
    if !matches!(method, Method::Put | Method::Post) {
        return Ok(None);
    }
    let mut buf = String::new();
    request
        .as_reader()
        .read_to_string(&mut buf)
        .context("request body is not valid UTF-8")?;
    Ok(Some(buf))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(
    ctx: &WebContext,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => serve_frontend(),

        (&Method::Get, "/api/dashboard") => api::get_dashboard(&ctx.dashboard),
        (&Method::Post, "/api/refresh") => api::post_refresh(&ctx.dashboard),
        (&Method::Get, "/api/config") => api::get_config(&ctx.dashboard),
        (&Method::Put, "/api/config") => api::put_config(&ctx.dashboard, body.unwrap_or("{}")),
        (&Method::Post, "/api/insight") => api::post_insight(&ctx.dashboard, &ctx.insight),
        (&Method::Get, "/api/history") => api::get_history(url),
        (&Method::Get, "/api/schema") => api::get_schema(),

        _ => not_found(),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn serve_frontend() -> Result<Response<Cursor<Vec<u8>>>> {
    Ok(Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html()?)
        .with_status_code(StatusCode(200)))
}

fn not_found() -> Result<Response<Cursor<Vec<u8>>>> {
    Ok(Response::from_data(br#"{"error": "not found"}"#.to_vec())
        .with_header(content_type_json()?)
        .with_status_code(StatusCode(404)))
}

fn error_response(err: &anyhow::Error, status: StatusCode) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": format!("{err:#}") }).to_string();
    let resp = Response::from_data(body.into_bytes()).with_status_code(status);
    match content_type_json() {
        Ok(header) => resp.with_header(header),
        Err(_) => resp,
    }
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Result<Header> {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .map_err(|()| anyhow!("invalid content-type header"))
}

/// HTML content type header.
fn content_type_html() -> Result<Header> {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8")
        .map_err(|()| anyhow!("invalid content-type header"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

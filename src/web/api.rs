//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content.

use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::analytics::reporter;
use crate::config::SourceConfig;
use crate::config::schema::InsightConfig;
use crate::insight;
use crate::model::{ConnectivityState, DashboardPayload, Totals};
use crate::refresh::{Dashboard, RefreshOutcome};

use super::content_type_json;

/// Default number of events returned by `GET /api/history`.
const DEFAULT_HISTORY_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// JSON request / response types
// ---------------------------------------------------------------------------

/// Dashboard API response: the current snapshot plus refresh status.
#[derive(Serialize)]
struct DashboardResponse {
    state: ConnectivityState,
    payload: DashboardPayload,
    totals: Totals,
    failure: Option<String>,
    dropped_records: usize,
    updated_at: Option<DateTime<Utc>>,
    refreshes: u64,
    refreshing: bool,
}

#[derive(Serialize)]
struct RefreshResponse {
    /// `"completed"`, `"already_running"` or `"superseded"`.
    outcome: &'static str,
    state: ConnectivityState,
}

/// Settings form submission.
///
/// `endpoint` replaces the stored endpoint (absent or blank means demo mode).
/// An absent or blank `credential` keeps the stored one; `clear_credential`
/// removes it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigUpdateRequest {
    endpoint: Option<String>,
    credential: Option<String>,
    clear_credential: bool,
}

impl ConfigUpdateRequest {
    fn apply(self, current: SourceConfig) -> SourceConfig {
        let mut source = current;
        source.endpoint = self.endpoint;
        if self.clear_credential {
            source.credential = None;
        } else if let Some(credential) = self.credential.filter(|c| !c.trim().is_empty()) {
            source.credential = Some(credential);
        }
        source.normalized()
    }
}

#[derive(Serialize)]
struct ConfigResponse {
    endpoint: Option<String>,
    /// Masked credential, for display only.
    credential: Option<String>,
    has_credential: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json()?)
        .with_status_code(StatusCode(200)))
}

/// Parse the `?limit=N` query parameter from a URL.
fn parse_limit_param(url: &str) -> Option<usize> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == "limit" { v.parse().ok() } else { None }
    })
}

fn config_response(source: &SourceConfig) -> ConfigResponse {
    let masked = source.masked();
    ConfigResponse {
        endpoint: masked.endpoint().map(str::to_string),
        credential: masked.credential().map(str::to_string),
        has_credential: source.credential().is_some(),
    }
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/dashboard`: current snapshot.
pub fn get_dashboard(dashboard: &Dashboard) -> Result<Response<Cursor<Vec<u8>>>> {
    let snapshot = dashboard.snapshot();
    json_response(&DashboardResponse {
        state: snapshot.state,
        totals: snapshot.payload.totals(),
        payload: snapshot.payload,
        failure: snapshot.failure,
        dropped_records: snapshot.dropped_records,
        updated_at: snapshot.updated_at,
        refreshes: snapshot.refreshes,
        refreshing: dashboard.is_refreshing(),
    })
}

/// `POST /api/refresh`: manual refresh.
pub fn post_refresh(dashboard: &Dashboard) -> Result<Response<Cursor<Vec<u8>>>> {
    let outcome = match dashboard.refresh() {
        RefreshOutcome::Completed(_) => "completed",
        RefreshOutcome::AlreadyRunning => "already_running",
        RefreshOutcome::Superseded => "superseded",
    };
    json_response(&RefreshResponse {
        outcome,
        state: dashboard.snapshot().state,
    })
}

/// `GET /api/config`: data-source settings with the credential masked.
pub fn get_config(dashboard: &Dashboard) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&config_response(&dashboard.store().read()))
}

/// `PUT /api/config`: save data-source settings, then refresh.
///
/// Expects JSON body:
/// `{ "endpoint": "https://...", "credential": "...", "clear_credential": false }`
pub fn put_config(dashboard: &Dashboard, body: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let req: ConfigUpdateRequest =
        serde_json::from_str(body).context("invalid JSON in config update request")?;

    let source = req.apply(dashboard.store().read());
    dashboard
        .save_source(&source)
        .context("failed to save data-source settings")?;
    dashboard.refresh();

    let result = serde_json::json!({
        "success": true,
        "state": dashboard.snapshot().state,
        "config": config_response(&source),
    });
    json_response(&result)
}

/// `POST /api/insight`: narrative report over the current payload.
pub fn post_insight(
    dashboard: &Dashboard,
    config: &InsightConfig,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let snapshot = dashboard.snapshot();
    json_response(&insight::analyze_with_config(config, &snapshot.payload))
}

/// `GET /api/schema`: the response format a data source must serve.
pub fn get_schema() -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&DashboardPayload::example())
}

/// `GET /api/history?limit=N`: fetch-event summary.
pub fn get_history(url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let limit = parse_limit_param(url).unwrap_or(DEFAULT_HISTORY_LIMIT);
    json_response(&reporter::compute_history(limit))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

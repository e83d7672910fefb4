//! Fetch-event logger: one JSONL line per completed reconciliation.
//!
//! Records which state each refresh resolved to and, for failures, why. The
//! credential and the full request URL are never written; only the endpoint
//! host is kept so the log can be shared when debugging an integration.
//!
//! Log file: `~/.metrix/events.jsonl`

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::model::ConnectivityState;
use crate::source::Reconciled;
use crate::source::request::{redact_urls, url_host};

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

/// A single reconciliation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchEvent {
    pub timestamp: String,
    pub state: ConnectivityState,
    /// Host of the configured endpoint, absent in demo mode.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub endpoint_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure: Option<String>,
    #[serde(default)]
    pub dropped_records: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<u64>,
    /// Number of metric samples in the resulting payload.
    #[serde(default)]
    pub metrics: usize,
}

impl FetchEvent {
    pub fn from_reconciled(source: &SourceConfig, result: &Reconciled) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            state: result.state,
            endpoint_host: source.endpoint().map(url_host),
            failure: result
                .failure
                .as_deref()
                .map(|reason| redact_failure(reason, source)),
            dropped_records: result.dropped_records,
            latency_ms: result.latency_ms,
            metrics: result.payload.metrics.len(),
        }
    }
}

/// Strip URLs and the credential from a failure reason before it is logged.
fn redact_failure(reason: &str, source: &SourceConfig) -> String {
    let redacted = redact_urls(reason);
    match source.credential() {
        Some(credential) => redacted.replace(credential, "****"),
        None => redacted,
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log a reconciliation outcome to `~/.metrix/events.jsonl`.
///
/// Best-effort; failures are silently ignored.
pub fn log_fetch(source: &SourceConfig, result: &Reconciled) {
    let Some(path) = events_log_path() else {
        return;
    };
    let _ = append_event(&path, &FetchEvent::from_reconciled(source, result));
}

/// Append one event to the log at `path`.
pub fn append_event(path: &Path, event: &FetchEvent) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(event)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every event from the default log. Missing file yields an empty vec.
pub fn read_all_events() -> Vec<FetchEvent> {
    events_log_path()
        .map(|path| read_events(&path))
        .unwrap_or_default()
}

/// Read events from `path`, skipping malformed lines.
pub fn read_events(path: &Path) -> Vec<FetchEvent> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<FetchEvent>(&line).ok())
        .collect()
}

/// Return the path to the events log.
pub fn events_log_path() -> Option<PathBuf> {
    crate::config::metrix_home().map(|dir| dir.join("events.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! CLI command implementations for metrix.
//!
//! Provides subcommand handlers for:
//! - `metrix fetch`: reconcile once and print the payload
//! - `metrix demo`: print a synthetic payload
//! - `metrix insight`: reconcile, then ask for a narrative report
//! - `metrix history`: summarize the fetch-event log
//! - `metrix web`: run the embedded dashboard
//! - `metrix schema`: print the payload a data source must return
//! - `metrix config show|init|set|clear|path`: configuration management

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::events;
use crate::analytics::reporter::{self, History};
use crate::config::{self, ConfigStore, FileStore, SourceConfig};
use crate::insight::{self, OllamaInsight};
use crate::model::{ConnectivityState, DashboardPayload, Insight};
use crate::source::request::CACHE_BUST_PARAM;
use crate::source::{self, HttpTransport, Reconciled};
use crate::synthetic;
use crate::web;

/// Output format for data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// metrix fetch
// ---------------------------------------------------------------------------

/// Reconcile once against the configured source and print the result.
pub fn run_fetch(format: OutputFormat) -> Result<()> {
    let settings = config::load();
    let store = FileStore::user()?;
    let source = store.read();

    let result = source::fetch_dashboard_data(&source, &HttpTransport::new());
    if settings.logging.enabled {
        events::log_fetch(&source, &result);
    }

    match format {
        OutputFormat::Json => print_reconciled_json(&result)?,
        OutputFormat::Csv => print_metrics_csv(&result.payload),
        OutputFormat::Table => {
            print_state_line(&result);
            print_payload_table(&result.payload);
        }
    }

    Ok(())
}

fn print_state_line(result: &Reconciled) {
    let label = state_label(result.state);
    match result.state {
        ConnectivityState::Connected => {
            let latency = result
                .latency_ms
                .map(|ms| format!(" ({ms} ms)"))
                .unwrap_or_default();
            println!("{label}{latency}");
            if result.dropped_records > 0 {
                println!(
                    "  {}",
                    format!("{} malformed records skipped", result.dropped_records).yellow()
                );
            }
        }
        ConnectivityState::Demo => {
            println!("{label}");
            println!(
                "  {}",
                "No data source configured. Set one with `metrix config set source.endpoint <url>`."
                    .dimmed()
            );
        }
        ConnectivityState::Disconnected => {
            println!("{label}");
            if let Some(reason) = &result.failure {
                println!("  {}", reason.red());
            }
        }
    }
    println!();
}

fn state_label(state: ConnectivityState) -> colored::ColoredString {
    let text = format!("● {}", state.to_string().to_uppercase());
    match state {
        ConnectivityState::Connected => text.green().bold(),
        ConnectivityState::Demo => text.yellow().bold(),
        ConnectivityState::Disconnected => text.red().bold(),
    }
}

fn print_reconciled_json(result: &Reconciled) -> Result<()> {
    let value = serde_json::json!({
        "state": result.state,
        "failure": result.failure,
        "dropped_records": result.dropped_records,
        "latency_ms": result.latency_ms,
        "payload": result.payload,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// metrix demo
// ---------------------------------------------------------------------------

/// Print a freshly generated demo payload.
pub fn run_demo(points: usize, format: OutputFormat) -> Result<()> {
    let payload = DashboardPayload {
        metrics: synthetic::generate_time_series(points),
        ..synthetic::demo_payload()
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&payload)?),
        OutputFormat::Csv => print_metrics_csv(&payload),
        OutputFormat::Table => print_payload_table(&payload),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Payload rendering
// ---------------------------------------------------------------------------

fn print_payload_table(payload: &DashboardPayload) {
    if payload.is_empty() {
        println!("{}", "No data.".yellow());
        return;
    }

    if let Some(current) = payload.current() {
        let totals = payload.totals();
        println!("{}", "Current".bold().cyan());
        println!(
            "  Visitors: {}  Page views: {}  Errors: {}  Latency: {} ms  (at {})",
            format_number(current.visitors),
            format_number(current.page_views),
            current.errors,
            current.latency_ms,
            current.timestamp,
        );
        println!(
            "  {}",
            format!(
                "Series total: {} visitors, {} page views, {} errors, {:.0} ms avg latency",
                format_number(totals.visitors),
                format_number(totals.page_views),
                format_number(totals.errors),
                totals.avg_latency_ms,
            )
            .dimmed()
        );
        println!();

        println!("{}", "Metrics".bold().cyan());
        println!(
            "  {:<8} {:>9} {:>11} {:>7} {:>9}",
            "Time", "Visitors", "Page views", "Errors", "Latency"
        );
        println!("  {}", "-".repeat(48));
        for (i, m) in payload.metrics.iter().enumerate() {
            let line = format!(
                "  {:<8} {:>9} {:>11} {:>7} {:>7}ms",
                truncate(&m.timestamp, 8),
                m.visitors,
                m.page_views,
                m.errors,
                m.latency_ms
            );
            if i % 2 == 0 {
                println!("{line}");
            } else {
                println!("{}", line.dimmed());
            }
        }
        println!();
    }

    if !payload.endpoints.is_empty() {
        println!("{}", "Top Endpoints".bold().cyan());
        println!("  {:<32} {:>8} {:>8} {:>6}", "Path", "Calls", "Avg ms", "Status");
        println!("  {}", "-".repeat(57));
        for e in payload.top_endpoints(10) {
            let status = e.status_code.to_string();
            let status = if (200..300).contains(&e.status_code) {
                status.green()
            } else {
                status.red()
            };
            println!(
                "  {:<32} {:>8} {:>8} {:>6}",
                truncate(&e.path, 32),
                format_number(e.calls),
                e.avg_latency_ms,
                status
            );
        }
        println!();
    }

    if !payload.geo.is_empty() {
        println!("{}", "Locations".bold().cyan());
        for g in &payload.geo {
            println!(
                "  {:<20} {:<16} {:>6} users  ({:.4}, {:.4})",
                truncate(&g.city, 20),
                truncate(&g.country, 16),
                g.users,
                g.lat,
                g.lng
            );
        }
    }
}

fn print_metrics_csv(payload: &DashboardPayload) {
    println!("timestamp,visitors,page_views,errors,latency_ms");
    for m in &payload.metrics {
        println!(
            "{},{},{},{},{}",
            m.timestamp, m.visitors, m.page_views, m.errors, m.latency_ms
        );
    }
}

// ---------------------------------------------------------------------------
// metrix insight
// ---------------------------------------------------------------------------

/// Reconcile, then produce a narrative report over the resulting payload.
pub fn run_insight(format: OutputFormat) -> Result<()> {
    let settings = config::load();
    let source = FileStore::user()?.read();
    let result = source::fetch_dashboard_data(&source, &HttpTransport::new());

    let provider = OllamaInsight::from_config(&settings.insight);
    if format == OutputFormat::Table {
        let client = provider.client();
        if !provider.is_enabled() {
            println!(
                "{}",
                "Insights are disabled. Enable with `metrix config set insight.enabled true`."
                    .yellow()
            );
        } else if !client.is_healthy() {
            println!(
                "{}",
                format!("Ollama is not reachable at {}.", client.base_url()).yellow()
            );
        } else {
            println!(
                "{}",
                format!("Analyzing with {}...", client.model_name()).dimmed()
            );
        }
    }

    let report = insight::analyze(
        &provider,
        &result.payload,
        settings.insight.recent_samples,
        settings.insight.top_endpoints,
    );

    match format {
        OutputFormat::Json | OutputFormat::Csv => {
            println!("{}", serde_json::to_string_pretty(&report)?)
        }
        OutputFormat::Table => {
            print_state_line(&result);
            print_insight(&report);
        }
    }
    Ok(())
}

fn print_insight(report: &Insight) {
    println!("{}", "Summary".bold().cyan());
    println!("  {}", report.summary);
    println!();
    println!("{}", "Anomalies".bold().cyan());
    for item in &report.anomalies {
        println!("  - {item}");
    }
    println!();
    println!("{}", "Recommendations".bold().cyan());
    for item in &report.recommendations {
        println!("  - {item}");
    }
}

// ---------------------------------------------------------------------------
// metrix history
// ---------------------------------------------------------------------------

/// Summarize recorded refreshes.
pub fn run_history(limit: usize, format: OutputFormat) -> Result<()> {
    let history = reporter::compute_history(limit);

    if history.total == 0 {
        println!(
            "{}",
            "No refreshes recorded yet. Run `metrix fetch` or `metrix web`.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
        OutputFormat::Csv => print_history_csv(&history),
        OutputFormat::Table => print_history_table(&history),
    }
    Ok(())
}

fn print_history_table(history: &History) {
    println!("{}", "metrix Refresh History".bold().cyan());
    println!("{}", "=".repeat(60));
    println!("  {} {}", "Refreshes:   ".bold(), history.total);
    println!(
        "  {} {}  {} {}  {} {}",
        "Connected:".bold(),
        history.connected.to_string().green(),
        "Demo:".bold(),
        history.demo.to_string().yellow(),
        "Disconnected:".bold(),
        history.disconnected.to_string().red(),
    );
    if let Some(pct) = history.availability_pct() {
        println!("  {} {pct:.1}%", "Availability:".bold());
    }
    if let Some(ms) = history.avg_latency_ms {
        println!("  {} {ms:.0} ms", "Avg latency: ".bold());
    }
    if let Some(failure) = &history.last_failure {
        println!(
            "  {} {} ({})",
            "Last failure:".bold(),
            failure.reason.red(),
            failure.timestamp
        );
    }
    println!();

    println!("{}", "Recent".bold().cyan());
    for event in &history.recent {
        let host = event.endpoint_host.as_deref().unwrap_or("-");
        println!(
            "  {:<26} {:<13} {:<24} {:>5} samples",
            truncate(&event.timestamp, 26),
            event.state.to_string(),
            truncate(host, 24),
            event.metrics
        );
    }
}

fn print_history_csv(history: &History) {
    println!("timestamp,state,endpoint_host,latency_ms,metrics,dropped_records,failure");
    for e in &history.recent {
        println!(
            "{},{},{},{},{},{},\"{}\"",
            e.timestamp,
            e.state,
            e.endpoint_host.as_deref().unwrap_or_default(),
            e.latency_ms.map(|ms| ms.to_string()).unwrap_or_default(),
            e.metrics,
            e.dropped_records,
            e.failure.as_deref().unwrap_or_default().replace('"', "'"),
        );
    }
}

// ---------------------------------------------------------------------------
// metrix web
// ---------------------------------------------------------------------------

/// Run the embedded dashboard server.
pub fn run_web(addr: Option<String>) -> Result<()> {
    let settings = config::load();
    let addr = addr.unwrap_or_else(|| settings.web.bind.clone());
    let store = Arc::new(FileStore::user()?);

    web::serve(
        &addr,
        store,
        Arc::new(HttpTransport::new()),
        settings.insight,
        settings.logging.enabled,
    )
}

// ---------------------------------------------------------------------------
// metrix schema
// ---------------------------------------------------------------------------

/// Print the wire format a data source must serve.
///
/// JSON output is the bare example payload, suitable for a stub server.
pub fn run_schema(format: OutputFormat) -> Result<()> {
    let example = serde_json::to_string_pretty(&DashboardPayload::example())?;
    if format == OutputFormat::Json {
        println!("{example}");
        return Ok(());
    }

    println!("{}", "Data source contract".bold());
    for line in schema_contract()? {
        println!("  {line}");
    }
    println!();
    println!("{}", "Example response".bold());
    println!("{example}");
    Ok(())
}

/// Request and response rules, with field names taken from the serialized
/// example payload.
fn schema_contract() -> Result<Vec<String>> {
    let value = serde_json::to_value(DashboardPayload::example())?;
    let object = value
        .as_object()
        .context("example payload is not a JSON object")?;

    let mut lines = vec![
        format!("GET <endpoint>?{CACHE_BUST_PARAM}=<unix ms>"),
        "Authorization: Bearer <credential>   (only when a credential is set)".to_string(),
        "Response: a JSON object with".to_string(),
    ];
    for (field, sample) in object {
        let rule = if field == "metrics" {
            "required array"
        } else {
            "optional array"
        };
        let fields = sample
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item.as_object())
            .map(|item| item.keys().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        lines.push(format!("  {field:<10} {rule:<20} [{{ {fields} }}]"));
    }
    Ok(lines)
}

// ---------------------------------------------------------------------------
// metrix config
// ---------------------------------------------------------------------------

/// Print the effective configuration.
pub fn run_config_show() -> Result<()> {
    let toml = config::show_effective_config()?;
    if let Some(path) = config::global_config_file() {
        println!("{}", format!("# {}", path.display()).dimmed());
    }
    println!("{toml}");
    Ok(())
}

/// Write the annotated default config file.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

/// Set a dotted config key.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)
        .with_context(|| format!("failed to set config key '{key}'"))?;
    let shown = if key == "source.credential" {
        config::schema::mask_secret(value)
    } else {
        value.to_string()
    };
    println!("{} {key} = {shown}", "Set".green());
    Ok(())
}

/// Blank out the data-source endpoint and credential.
pub fn run_config_clear() -> Result<()> {
    let store = FileStore::user()?;
    store.write(&SourceConfig::default())?;
    println!(
        "{} {}",
        "Data source cleared in".green(),
        store.path().display()
    );
    println!("{}", "The dashboard will show demo data.".dimmed());
    Ok(())
}

/// Print the config file path.
pub fn run_config_path() -> Result<()> {
    let path = config::global_config_file().context("could not determine home directory")?;
    println!("{}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format a number with thousands separators.
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Truncate a string to `max` characters, appending `…` when cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Insight adapter tests with stub providers.
use std::sync::Mutex;

use anyhow::{Result, bail};
use metrix::config::schema::InsightConfig;
use metrix::insight::{self, InsightProvider, validation::parse_insight};
use metrix::model::{DashboardPayload, EndpointStat, Insight, MetricSample};

/// Provider that records what it was given and replies with a canned report.
struct RecordingProvider {
    seen: Mutex<Option<(Vec<MetricSample>, Vec<EndpointStat>)>>,
}

impl InsightProvider for RecordingProvider {
    fn summarize(&self, metrics: &[MetricSample], endpoints: &[EndpointStat]) -> Result<Insight> {
        *self.seen.lock().unwrap() = Some((metrics.to_vec(), endpoints.to_vec()));
        Ok(Insight {
            summary: "Traffic is stable.".to_string(),
            anomalies: vec![],
            recommendations: vec!["Cache /api/orders".to_string()],
        })
    }
}

struct BrokenProvider;

impl InsightProvider for BrokenProvider {
    fn summarize(&self, _: &[MetricSample], _: &[EndpointStat]) -> Result<Insight> {
        bail!("connection refused")
    }
}

fn payload() -> DashboardPayload {
    let metrics = (0..12)
        .map(|h| MetricSample {
            timestamp: format!("{h:02}:00"),
            visitors: 100 + h,
            page_views: 200 + h,
            errors: 0,
            latency_ms: 120,
        })
        .collect();
    let endpoints = [("/a", 10), ("/b", 500), ("/c", 40)]
        .into_iter()
        .map(|(path, calls)| EndpointStat {
            path: path.to_string(),
            calls,
            avg_latency_ms: 90,
            status_code: 200,
        })
        .collect();
    DashboardPayload {
        metrics,
        endpoints,
        geo: vec![],
    }
}

#[test]
fn provider_sees_recent_samples_and_busiest_endpoints() {
    let provider = RecordingProvider {
        seen: Mutex::new(None),
    };
    let report = insight::analyze(&provider, &payload(), 10, 2);
    assert_eq!(report.summary, "Traffic is stable.");

    let (metrics, endpoints) = provider.seen.lock().unwrap().take().unwrap();
    assert_eq!(metrics.len(), 10);
    assert_eq!(metrics[0].timestamp, "02:00");
    assert_eq!(metrics[9].timestamp, "11:00");
    let paths: Vec<&str> = endpoints.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["/b", "/c"]);
}

#[test]
fn provider_failure_yields_fallback() {
    let report = insight::analyze(&BrokenProvider, &payload(), 10, 5);
    assert_eq!(report, insight::fallback_insight());
    assert_eq!(
        report.summary,
        "The analysis service is currently unreachable or not configured."
    );
}

#[test]
fn disabled_config_yields_fallback_without_network() {
    let config = InsightConfig {
        enabled: false,
        ..InsightConfig::default()
    };
    let report = insight::analyze_with_config(&config, &payload());
    assert_eq!(report, insight::fallback_insight());
}

#[test]
fn unreachable_service_yields_fallback() {
    let config = InsightConfig {
        enabled: true,
        ollama_url: "http://127.0.0.1:9".to_string(),
        timeout_ms: 500,
        ..InsightConfig::default()
    };
    let report = insight::analyze_with_config(&config, &payload());
    assert_eq!(report, insight::fallback_insight());
}

#[test]
fn parses_model_output_with_missing_lists() {
    let insight = parse_insight(r#"{"summary": "Quiet night."}"#).unwrap();
    assert_eq!(insight.summary, "Quiet night.");
    assert!(insight.anomalies.is_empty());
    assert!(insight.recommendations.is_empty());
}

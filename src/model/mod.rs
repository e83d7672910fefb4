//! Dashboard data model.
//!
//! These types are the single unit of exchange between the reconciliation
//! layer and every view (terminal tables, the web API, the insight adapter).
//! Field names serialize to the wire names used by external data sources
//! (`pageViews`, `latency`, `avgLatency`, `status`, `geoData`), so a payload
//! received from an endpoint re-serializes to the same JSON shape.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One point of the traffic time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Display label for the sample (e.g. `"14:00"`).
    pub timestamp: String,
    pub visitors: u64,
    #[serde(rename = "pageViews")]
    pub page_views: u64,
    pub errors: u64,
    #[serde(rename = "latency")]
    pub latency_ms: u64,
}

/// Per-route call statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStat {
    pub path: String,
    pub calls: u64,
    #[serde(rename = "avgLatency")]
    pub avg_latency_ms: u64,
    #[serde(rename = "status")]
    pub status_code: i64,
}

/// Visitor count for a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub users: u64,
}

impl GeoSample {
    /// Whether the coordinates fall inside the valid latitude/longitude ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The full data set shown by the dashboard. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub metrics: Vec<MetricSample>,
    pub endpoints: Vec<EndpointStat>,
    #[serde(rename = "geoData")]
    pub geo: Vec<GeoSample>,
}

/// Aggregates over the metric series, used by summaries and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub visitors: u64,
    pub page_views: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
}

impl DashboardPayload {
    /// Payload with no records in any collection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.endpoints.is_empty() && self.geo.is_empty()
    }

    /// A small payload with one record of each kind, in the exact shape a
    /// data source must return. Backs `metrix schema` and `GET /api/schema`.
    pub fn example() -> Self {
        Self {
            metrics: vec![
                MetricSample {
                    timestamp: "09:00".to_string(),
                    visitors: 1200,
                    page_views: 3100,
                    errors: 4,
                    latency_ms: 180,
                },
                MetricSample {
                    timestamp: "10:00".to_string(),
                    visitors: 1350,
                    page_views: 3400,
                    errors: 2,
                    latency_ms: 165,
                },
            ],
            endpoints: vec![EndpointStat {
                path: "/api/orders".to_string(),
                calls: 5400,
                avg_latency_ms: 210,
                status_code: 200,
            }],
            geo: vec![GeoSample {
                city: "Lisbon".to_string(),
                country: "Portugal".to_string(),
                lat: 38.7223,
                lng: -9.1393,
                users: 310,
            }],
        }
    }

    /// The most recent metric sample (last element of the series).
    pub fn current(&self) -> Option<&MetricSample> {
        self.metrics.last()
    }

    /// Endpoints ranked by call volume, highest first, limited to `n`.
    ///
    /// Returns copies; the payload's own ordering is left untouched.
    pub fn top_endpoints(&self, n: usize) -> Vec<EndpointStat> {
        let mut ranked = self.endpoints.clone();
        ranked.sort_by(|a, b| b.calls.cmp(&a.calls));
        ranked.truncate(n);
        ranked
    }

    /// Sum the counters across the series and average the latency.
    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for sample in &self.metrics {
            totals.visitors = totals.visitors.saturating_add(sample.visitors);
            totals.page_views = totals.page_views.saturating_add(sample.page_views);
            totals.errors = totals.errors.saturating_add(sample.errors);
        }
        if !self.metrics.is_empty() {
            let latency_sum: f64 = self.metrics.iter().map(|m| m.latency_ms as f64).sum();
            totals.avg_latency_ms = latency_sum / self.metrics.len() as f64;
        }
        totals
    }
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

/// Where the currently displayed payload came from.
///
/// - `Connected`: validated data from the configured endpoint.
/// - `Demo`: no endpoint configured, synthetic data.
/// - `Disconnected`: endpoint configured but unreachable or invalid, empty data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Connected,
    Demo,
    Disconnected,
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Demo => write!(f, "demo"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Insight
// ---------------------------------------------------------------------------

/// Narrative report produced by the insight adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub summary: String,
    #[serde(default)]
    pub anomalies: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: &str, visitors: u64, latency: u64) -> MetricSample {
        MetricSample {
            timestamp: label.to_string(),
            visitors,
            page_views: visitors * 2,
            errors: 1,
            latency_ms: latency,
        }
    }

    fn endpoint(path: &str, calls: u64) -> EndpointStat {
        EndpointStat {
            path: path.to_string(),
            calls,
            avg_latency_ms: 100,
            status_code: 200,
        }
    }

    #[test]
    fn metric_sample_uses_wire_names() {
        let json = serde_json::to_value(sample("10:00", 5, 50)).unwrap();
        assert_eq!(json["pageViews"], 10);
        assert_eq!(json["latency"], 50);
        assert!(json.get("latency_ms").is_none());
    }

    #[test]
    fn payload_geo_serializes_as_geo_data() {
        let json = serde_json::to_value(DashboardPayload::empty()).unwrap();
        assert!(json.get("geoData").is_some());
        assert!(json.get("geo").is_none());
    }

    #[test]
    fn current_is_last_sample() {
        let payload = DashboardPayload {
            metrics: vec![sample("09:00", 1, 10), sample("10:00", 2, 20)],
            ..DashboardPayload::default()
        };
        assert_eq!(payload.current().unwrap().timestamp, "10:00");
        assert!(DashboardPayload::empty().current().is_none());
    }

    #[test]
    fn top_endpoints_ranks_without_reordering_payload() {
        let payload = DashboardPayload {
            endpoints: vec![endpoint("/a", 3), endpoint("/b", 10), endpoint("/c", 7)],
            ..DashboardPayload::default()
        };
        let top = payload.top_endpoints(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].path, "/b");
        assert_eq!(top[1].path, "/c");
        assert_eq!(payload.endpoints[0].path, "/a");
    }

    #[test]
    fn totals_sum_counters_and_average_latency() {
        let payload = DashboardPayload {
            metrics: vec![sample("09:00", 10, 100), sample("10:00", 30, 300)],
            ..DashboardPayload::default()
        };
        let totals = payload.totals();
        assert_eq!(totals.visitors, 40);
        assert_eq!(totals.page_views, 80);
        assert_eq!(totals.errors, 2);
        assert!((totals.avg_latency_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn geo_coordinate_ranges() {
        let mut geo = GeoSample {
            city: "Istanbul".to_string(),
            country: "Turkey".to_string(),
            lat: 41.0,
            lng: 29.0,
            users: 3,
        };
        assert!(geo.has_valid_coordinates());
        geo.lat = 91.0;
        assert!(!geo.has_valid_coordinates());
        geo.lat = 0.0;
        geo.lng = f64::NAN;
        assert!(!geo.has_valid_coordinates());
    }

    #[test]
    fn connectivity_state_display_matches_serde() {
        for state in [
            ConnectivityState::Connected,
            ConnectivityState::Demo,
            ConnectivityState::Disconnected,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}

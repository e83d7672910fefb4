//! Data reconciliation: decides where dashboard data comes from and whether
//! it can be trusted.
//!
//! Every call to [`fetch_dashboard_data`] yields exactly one of three outcomes:
//!
//! | Configuration            | Outcome                                  |
//! |--------------------------|------------------------------------------|
//! | no endpoint              | `Demo`, synthetic payload, no request    |
//! | endpoint, valid response | `Connected`, payload as received         |
//! | endpoint, any failure    | `Disconnected`, empty payload            |
//!
//! A configured endpoint that fails never falls back to demo data: "not set
//! up yet" and "integration broken" must stay distinguishable. The function
//! never returns an error; failure reasons travel in [`Reconciled::failure`].

pub mod request;
pub mod validation;

use std::time::Instant;

use anyhow::Result;

use crate::config::SourceConfig;
use crate::model::{ConnectivityState, DashboardPayload};
use crate::synthetic;

pub use request::{HttpTransport, SourceRequest, Transport};

/// Outcome of one reconciliation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub payload: DashboardPayload,
    pub state: ConnectivityState,
    /// Why the source was treated as disconnected.
    pub failure: Option<String>,
    /// Records discarded by per-record validation.
    pub dropped_records: usize,
    /// Wall-clock time of the request, when one was made.
    pub latency_ms: Option<u64>,
    /// The exact URL requested, including the cache-busting parameter.
    pub request_url: Option<String>,
}

impl Reconciled {
    fn demo() -> Self {
        Self {
            payload: synthetic::demo_payload(),
            state: ConnectivityState::Demo,
            failure: None,
            dropped_records: 0,
            latency_ms: None,
            request_url: None,
        }
    }
}

/// Reconcile the dashboard payload for the given source configuration.
pub fn fetch_dashboard_data(source: &SourceConfig, transport: &dyn Transport) -> Reconciled {
    let Some(endpoint) = source.endpoint() else {
        return Reconciled::demo();
    };

    let request = SourceRequest::build(source, endpoint);
    let start = Instant::now();
    let result = fetch_live(&request, transport);
    let latency_ms = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(decoded) => Reconciled {
            payload: decoded.payload,
            state: ConnectivityState::Connected,
            failure: None,
            dropped_records: decoded.dropped,
            latency_ms,
            request_url: Some(request.url),
        },
        Err(e) => Reconciled {
            payload: DashboardPayload::empty(),
            state: ConnectivityState::Disconnected,
            failure: Some(format!("{e:#}")),
            dropped_records: 0,
            latency_ms,
            request_url: Some(request.url),
        },
    }
}

fn fetch_live(request: &SourceRequest, transport: &dyn Transport) -> Result<validation::Decoded> {
    let body = transport.get(request)?;
    validation::decode_payload(&body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;

    use super::*;

    /// Transport that replays a fixed result and records every request.
    struct FakeTransport {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<SourceRequest>>,
    }

    impl FakeTransport {
        fn ok(body: &str) -> Self {
            Self {
                reply: Ok(body.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, request: &SourceRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(|e| anyhow!(e))
        }
    }

    #[test]
    fn no_endpoint_yields_demo_without_request() {
        let transport = FakeTransport::ok("{}");
        let result = fetch_dashboard_data(&SourceConfig::default(), &transport);
        assert_eq!(result.state, ConnectivityState::Demo);
        assert!(!result.payload.metrics.is_empty());
        assert_eq!(transport.calls(), 0);
        assert!(result.request_url.is_none());
    }

    #[test]
    fn blank_endpoint_counts_as_absent() {
        let transport = FakeTransport::ok("{}");
        let source = SourceConfig {
            endpoint: Some("   ".to_string()),
            ..SourceConfig::default()
        };
        let result = fetch_dashboard_data(&source, &transport);
        assert_eq!(result.state, ConnectivityState::Demo);
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn transport_failure_is_disconnected_with_reason() {
        let transport = FakeTransport::failing("HTTP 503 Service Unavailable");
        let source = SourceConfig::new(Some("https://stats.test"), None);
        let result = fetch_dashboard_data(&source, &transport);
        assert_eq!(result.state, ConnectivityState::Disconnected);
        assert!(result.payload.is_empty());
        assert!(result.failure.unwrap().contains("503"));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn invalid_shape_is_disconnected() {
        let transport = FakeTransport::ok(r#"{"metrics": 12}"#);
        let source = SourceConfig::new(Some("https://stats.test"), None);
        let result = fetch_dashboard_data(&source, &transport);
        assert_eq!(result.state, ConnectivityState::Disconnected);
        assert!(result.payload.is_empty());
    }

    #[test]
    fn valid_response_is_connected_and_counts_drops() {
        let transport = FakeTransport::ok(
            r#"{"metrics":[
                {"timestamp":"10:00","visitors":5,"pageViews":10,"errors":0,"latency":50},
                {"timestamp":"11:00"}
            ]}"#,
        );
        let source = SourceConfig::new(Some("https://stats.test"), None);
        let result = fetch_dashboard_data(&source, &transport);
        assert_eq!(result.state, ConnectivityState::Connected);
        assert_eq!(result.payload.metrics.len(), 1);
        assert_eq!(result.dropped_records, 1);
        assert!(result.failure.is_none());
        assert!(result.latency_ms.is_some());
    }

    #[test]
    fn request_url_carries_cache_stamp() {
        let transport = FakeTransport::ok(r#"{"metrics":[]}"#);
        let source = SourceConfig::new(Some("https://stats.test/m?site=a"), None);
        let result = fetch_dashboard_data(&source, &transport);
        let url = result.request_url.unwrap();
        assert!(url.starts_with("https://stats.test/m?site=a&_t="));
    }
}

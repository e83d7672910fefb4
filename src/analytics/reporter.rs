//! History reporter. Aggregates the fetch-event log for `metrix history`.

use serde::Serialize;

use crate::analytics::events::{self, FetchEvent};
use crate::model::ConnectivityState;

/// Summary of recorded refreshes.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct History {
    pub total: usize,
    pub connected: usize,
    pub demo: usize,
    pub disconnected: usize,
    /// Mean request latency over refreshes that made a request.
    pub avg_latency_ms: Option<f64>,
    pub last_failure: Option<FailureNote>,
    /// Most recent events, newest first.
    pub recent: Vec<FetchEvent>,
}

/// When and why the source last failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureNote {
    pub timestamp: String,
    pub reason: String,
}

impl History {
    /// Share of refreshes that ended connected, as a percentage of
    /// refreshes that targeted a real endpoint.
    pub fn availability_pct(&self) -> Option<f64> {
        let attempts = self.connected + self.disconnected;
        (attempts > 0).then(|| self.connected as f64 / attempts as f64 * 100.0)
    }
}

/// Summarize the default event log, keeping the `limit` latest events.
pub fn compute_history(limit: usize) -> History {
    build_history(&events::read_all_events(), limit)
}

/// Summarize `events` (oldest first, as stored).
pub fn build_history(events: &[FetchEvent], limit: usize) -> History {
    let mut history = History {
        total: events.len(),
        ..History::default()
    };

    let mut latency_sum = 0u64;
    let mut latency_count = 0u64;

    for event in events {
        match event.state {
            ConnectivityState::Connected => history.connected += 1,
            ConnectivityState::Demo => history.demo += 1,
            ConnectivityState::Disconnected => history.disconnected += 1,
        }
        if let Some(ms) = event.latency_ms {
            latency_sum += ms;
            latency_count += 1;
        }
    }

    if latency_count > 0 {
        history.avg_latency_ms = Some(latency_sum as f64 / latency_count as f64);
    }

    history.last_failure = events.iter().rev().find_map(|e| {
        e.failure.as_ref().map(|reason| FailureNote {
            timestamp: e.timestamp.clone(),
            reason: reason.clone(),
        })
    });

    history.recent = events.iter().rev().take(limit).cloned().collect();
    history
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: &str, state: ConnectivityState, failure: Option<&str>, latency: Option<u64>) -> FetchEvent {
        FetchEvent {
            timestamp: ts.to_string(),
            state,
            endpoint_host: None,
            failure: failure.map(str::to_string),
            dropped_records: 0,
            latency_ms: latency,
            metrics: 0,
        }
    }

    #[test]
    fn empty_log_yields_empty_history() {
        let history = build_history(&[], 10);
        assert_eq!(history, History::default());
        assert_eq!(history.availability_pct(), None);
    }

    #[test]
    fn counts_states_and_tracks_last_failure() {
        let events = vec![
            event("t1", ConnectivityState::Demo, None, None),
            event("t2", ConnectivityState::Disconnected, Some("HTTP 500"), Some(30)),
            event("t3", ConnectivityState::Connected, None, Some(10)),
            event("t4", ConnectivityState::Disconnected, Some("timeout"), Some(50)),
            event("t5", ConnectivityState::Connected, None, Some(10)),
        ];
        let history = build_history(&events, 2);

        assert_eq!(history.total, 5);
        assert_eq!(history.connected, 2);
        assert_eq!(history.demo, 1);
        assert_eq!(history.disconnected, 2);
        assert_eq!(history.avg_latency_ms, Some(25.0));
        assert_eq!(history.last_failure.as_ref().unwrap().reason, "timeout");
        assert_eq!(history.availability_pct(), Some(50.0));

        let recent: Vec<&str> = history.recent.iter().map(|e| e.timestamp.as_str()).collect();
        assert_eq!(recent, ["t5", "t4"]);
    }
}

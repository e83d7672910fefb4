//! Prompt construction for narrative insights.
//!
//! The system message fixes the role and the required JSON shape; the user
//! message carries the data (recent samples and busiest endpoints) as JSON.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::model::{DashboardPayload, EndpointStat, MetricSample};

/// The slice of a payload handed to the insight provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightInput {
    pub recent_metrics: Vec<MetricSample>,
    pub top_endpoints: Vec<EndpointStat>,
}

impl InsightInput {
    /// Take the last `recent` samples and the `top` busiest endpoints.
    pub fn from_payload(payload: &DashboardPayload, recent: usize, top: usize) -> Self {
        let skip = payload.metrics.len().saturating_sub(recent);
        Self {
            recent_metrics: payload.metrics[skip..].to_vec(),
            top_endpoints: payload.top_endpoints(top),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a senior DevOps engineer and data analyst. \
You review website traffic metrics and API endpoint statistics.\n\n\
Respond with a single JSON object and nothing else, using exactly these keys:\n\
- \"summary\": a short paragraph on the overall traffic situation\n\
- \"anomalies\": an array of strings, each a possible anomaly \
(for example a high error rate or a sudden latency increase)\n\
- \"recommendations\": an array of strings with performance improvements\n\n\
Use empty arrays when there is nothing to report. Do not invent metrics \
that are not in the data.";

/// Build `(system, user)` chat messages for the given input.
pub fn build_chat_messages(input: &InsightInput) -> Result<(String, String)> {
    let metrics =
        serde_json::to_string(&input.recent_metrics).context("failed to encode metric samples")?;
    let endpoints =
        serde_json::to_string(&input.top_endpoints).context("failed to encode endpoint stats")?;

    let user = format!(
        "Metric samples (most recent last):\n{metrics}\n\n\
         Most called endpoints:\n{endpoints}\n\n\
         Analyze these metrics."
    );

    Ok((SYSTEM_PROMPT.to_string(), user))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(samples: usize) -> DashboardPayload {
        DashboardPayload {
            metrics: (0..samples)
                .map(|i| MetricSample {
                    timestamp: format!("{i:02}:00"),
                    visitors: i as u64,
                    page_views: 0,
                    errors: 0,
                    latency_ms: 0,
                })
                .collect(),
            endpoints: (0..8)
                .map(|i| EndpointStat {
                    path: format!("/e{i}"),
                    calls: i,
                    avg_latency_ms: 10,
                    status_code: 200,
                })
                .collect(),
            geo: Vec::new(),
        }
    }

    #[test]
    fn input_keeps_most_recent_samples() {
        let input = InsightInput::from_payload(&payload(15), 10, 5);
        assert_eq!(input.recent_metrics.len(), 10);
        assert_eq!(input.recent_metrics[0].timestamp, "05:00");
        assert_eq!(input.recent_metrics[9].timestamp, "14:00");
    }

    #[test]
    fn input_handles_short_series() {
        let input = InsightInput::from_payload(&payload(3), 10, 5);
        assert_eq!(input.recent_metrics.len(), 3);
    }

    #[test]
    fn input_ranks_endpoints_by_calls() {
        let input = InsightInput::from_payload(&payload(1), 10, 5);
        let paths: Vec<&str> = input.top_endpoints.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["/e7", "/e6", "/e5", "/e4", "/e3"]);
    }

    #[test]
    fn user_message_embeds_wire_json() {
        let input = InsightInput::from_payload(&payload(2), 10, 5);
        let (system, user) = build_chat_messages(&input).unwrap();
        assert!(system.contains("\"recommendations\""));
        assert!(user.contains("\"pageViews\""));
        assert!(user.contains("\"avgLatency\""));
    }
}

/// Narrative insights over the current dashboard payload.
///
/// The insight adapter sits beside the reconciliation layer, not inside it:
/// it reads whatever payload is currently displayed, and its failures never
/// touch connectivity state. Any error (disabled provider, unreachable
/// service, malformed model output) degrades to [`fallback_insight`].
///
/// Providers implement [`InsightProvider`]. The shipped implementation is
/// [`OllamaInsight`]; tests plug in stubs.
///
/// # Feature Flag
///
/// Disabled by default. Enable with `METRIX_INSIGHT=1` or
/// `[insight] enabled = true` in `~/.metrix/config.toml`.
use anyhow::Result;

pub mod ollama;
pub mod prompts;
pub mod validation;

use crate::config::schema::InsightConfig;
use crate::model::{DashboardPayload, EndpointStat, Insight, MetricSample};
use ollama::{ChatMessage, OllamaClient};
use prompts::{InsightInput, build_chat_messages};

/// Something that can turn metrics into a narrative report.
pub trait InsightProvider: Send + Sync {
    fn summarize(&self, metrics: &[MetricSample], endpoints: &[EndpointStat]) -> Result<Insight>;
}

/// The fixed report returned when no real analysis is available.
pub fn fallback_insight() -> Insight {
    Insight {
        summary: "The analysis service is currently unreachable or not configured.".to_string(),
        anomalies: vec!["Metrics could not be analyzed.".to_string()],
        recommendations: vec!["Check the insight service configuration.".to_string()],
    }
}

/// Analyze a payload: the last `recent` samples and the `top` busiest
/// endpoints are handed to `provider`. Never fails.
pub fn analyze(
    provider: &dyn InsightProvider,
    payload: &DashboardPayload,
    recent: usize,
    top: usize,
) -> Insight {
    let input = InsightInput::from_payload(payload, recent, top);
    provider
        .summarize(&input.recent_metrics, &input.top_endpoints)
        .unwrap_or_else(|_| fallback_insight())
}

/// Analyze with the provider and limits from the insight config.
pub fn analyze_with_config(config: &InsightConfig, payload: &DashboardPayload) -> Insight {
    let provider = OllamaInsight::from_config(config);
    analyze(&provider, payload, config.recent_samples, config.top_endpoints)
}

// ---------------------------------------------------------------------------
// Ollama provider
// ---------------------------------------------------------------------------

/// Insight provider backed by a local Ollama model.
#[derive(Debug, Clone)]
pub struct OllamaInsight {
    client: OllamaClient,
    enabled: bool,
}

impl OllamaInsight {
    pub fn from_config(config: &InsightConfig) -> Self {
        Self {
            client: OllamaClient::from_config(config),
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

impl InsightProvider for OllamaInsight {
    fn summarize(&self, metrics: &[MetricSample], endpoints: &[EndpointStat]) -> Result<Insight> {
        if !self.enabled {
            anyhow::bail!("insight service is disabled");
        }

        let input = InsightInput {
            recent_metrics: metrics.to_vec(),
            top_endpoints: endpoints.to_vec(),
        };
        let (system, user) = build_chat_messages(&input)?;
        let raw = self
            .client
            .chat_json(&[ChatMessage::system(system), ChatMessage::user(user)])?;

        validation::parse_insight(&raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    #[test]
    fn disabled_provider_falls_back() {
        let config = InsightConfig::default();
        let insight = analyze_with_config(&config, &synthetic::demo_payload());
        assert_eq!(insight, fallback_insight());
    }

    #[test]
    fn disabled_provider_errors_without_network() {
        let provider = OllamaInsight::from_config(&InsightConfig {
            ollama_url: "http://127.0.0.1:1".to_string(),
            ..InsightConfig::default()
        });
        assert!(!provider.is_enabled());
        assert!(provider.summarize(&[], &[]).is_err());
    }

    #[test]
    fn fallback_has_one_entry_per_list() {
        let insight = fallback_insight();
        assert!(!insight.summary.is_empty());
        assert_eq!(insight.anomalies.len(), 1);
        assert_eq!(insight.recommendations.len(), 1);
    }
}

/// Validation for model-generated insight text.
///
/// Models in JSON mode still occasionally wrap the object in a Markdown code
/// fence or prefix it with a sentence. We cut the text down to the outermost
/// `{ ... }`, parse it, and reject results without a usable summary.
use anyhow::{Context, Result, anyhow};

use crate::model::Insight;

/// Parse and validate a raw model response into an [`Insight`].
pub fn parse_insight(raw: &str) -> Result<Insight> {
    let json = extract_object(raw).ok_or_else(|| anyhow!("no JSON object in model output"))?;
    let mut insight: Insight =
        serde_json::from_str(json).context("model output does not match the insight shape")?;

    insight.summary = insight.summary.trim().to_string();
    if insight.summary.is_empty() {
        return Err(anyhow!("model returned an empty summary"));
    }

    insight.anomalies = clean_list(insight.anomalies);
    insight.recommendations = clean_list(insight.recommendations);
    Ok(insight)
}

/// Slice from the first `{` to the last `}`.
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let raw = r#"{"summary":"Traffic is steady.","anomalies":[],"recommendations":["Add caching"]}"#;
        let insight = parse_insight(raw).unwrap();
        assert_eq!(insight.summary, "Traffic is steady.");
        assert!(insight.anomalies.is_empty());
        assert_eq!(insight.recommendations, ["Add caching"]);
    }

    #[test]
    fn strips_code_fence_and_preamble() {
        let raw = "Here you go:\n```json\n{\"summary\":\"ok\",\"anomalies\":[\"spike at 14:00\"]}\n```";
        let insight = parse_insight(raw).unwrap();
        assert_eq!(insight.anomalies, ["spike at 14:00"]);
        assert!(insight.recommendations.is_empty());
    }

    #[test]
    fn drops_blank_list_entries() {
        let raw = r#"{"summary":"ok","anomalies":["  ", "errors up "],"recommendations":[""]}"#;
        let insight = parse_insight(raw).unwrap();
        assert_eq!(insight.anomalies, ["errors up"]);
        assert!(insight.recommendations.is_empty());
    }

    #[test]
    fn rejects_empty_summary() {
        assert!(parse_insight(r#"{"summary":"   "}"#).is_err());
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_insight("I could not analyze this.").is_err());
        assert!(parse_insight("} backwards {").is_err());
        assert!(parse_insight(r#"{"anomalies": []}"#).is_err());
    }
}

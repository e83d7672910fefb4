/// Configuration schema and defaults for metrix.
///
/// Maps to `~/.metrix/config.toml` with the sections `[source]`, `[insight]`,
/// `[web]` and `[logging]`. Every field has a built-in default so a missing
/// file, or a file with only a `[source]` table, is a valid configuration.
use serde::{Deserialize, Serialize};

/// Default bind address for `metrix web`.
pub const DEFAULT_WEB_BIND: &str = "127.0.0.1:9747";

/// Default Ollama endpoint for narrative insights.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model for narrative insights.
pub const DEFAULT_INSIGHT_MODEL: &str = "llama3.2:3b";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Fully resolved metrix configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetrixConfig {
    pub source: SourceConfig,
    pub insight: InsightConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [source]
// ---------------------------------------------------------------------------

/// Where dashboard data comes from.
///
/// An absent `endpoint` means no external source is configured and the
/// dashboard runs on demo data. Values are stored as plain strings; blank
/// strings are treated as absent (see [`SourceConfig::normalized`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// External data-source URL.
    pub endpoint: Option<String>,
    /// Optional bearer token sent as `Authorization: Bearer <credential>`.
    pub credential: Option<String>,
    /// Request timeout in milliseconds. `0` leaves the HTTP client default
    /// in place (no explicit timeout).
    pub timeout_ms: u64,
}

impl SourceConfig {
    /// Build a source config with the given endpoint and credential.
    pub fn new(endpoint: Option<&str>, credential: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.map(str::to_string),
            credential: credential.map(str::to_string),
            timeout_ms: 0,
        }
        .normalized()
    }

    /// Trim values and turn blank strings into `None`.
    pub fn normalized(mut self) -> Self {
        self.endpoint = non_blank(self.endpoint);
        self.credential = non_blank(self.credential);
        self
    }

    /// The configured endpoint, if any non-blank value is present.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The configured credential, if any non-blank value is present.
    pub fn credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Copy with the credential replaced by a mask, for display.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.credential = self.credential().map(mask_secret);
        copy
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Mask all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

// ---------------------------------------------------------------------------
// [insight]
// ---------------------------------------------------------------------------

/// Settings for the narrative insight provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Disabled by default; the fallback insight is returned when off.
    pub enabled: bool,
    pub model: String,
    pub ollama_url: String,
    pub timeout_ms: u64,
    /// Number of most recent metric samples included in the prompt.
    pub recent_samples: usize,
    /// Number of busiest endpoints included in the prompt.
    pub top_endpoints: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: DEFAULT_INSIGHT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            timeout_ms: 30_000,
            recent_samples: 10,
            top_endpoints: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_WEB_BIND.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Fetch-event log settings (`~/.metrix/events.jsonl`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetrixConfig {
    /// Annotated default config written by `metrix config init`.
    pub fn default_toml() -> &'static str {
        r#"# metrix configuration
# Environment variables (METRIX_API_URL, METRIX_API_KEY, ...) override these values.

[source]
# External data-source URL. Leave empty to run on demo data.
endpoint = ""
# Optional bearer token.
credential = ""
# Request timeout in milliseconds (0 = no explicit timeout).
timeout_ms = 0

[insight]
enabled = false
model = "llama3.2:3b"
ollama_url = "http://localhost:11434"
timeout_ms = 30000
recent_samples = 10
top_endpoints = 5

[web]
bind = "127.0.0.1:9747"

[logging]
enabled = true
"#
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

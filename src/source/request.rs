//! Outbound request construction and the HTTP transport seam.
//!
//! The reconciliation layer never talks to `ureq` directly: it builds a
//! [`SourceRequest`] and hands it to a [`Transport`]. Production code uses
//! [`HttpTransport`]; tests substitute a recording fake.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use crate::config::SourceConfig;

/// Query parameter appended to every request to defeat intermediate caches.
pub const CACHE_BUST_PARAM: &str = "_t";

/// Last stamp handed out by [`next_cache_stamp`].
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A fully built GET request to the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// `None` leaves the client's default in place (no explicit timeout).
    pub timeout: Option<Duration>,
}

impl SourceRequest {
    /// Build the request for `endpoint` using the credential and timeout from
    /// `source`.
    pub fn build(source: &SourceConfig, endpoint: &str) -> Self {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(credential) = source.credential() {
            headers.push(("Authorization".to_string(), format!("Bearer {credential}")));
        }

        let timeout = (source.timeout_ms > 0).then(|| Duration::from_millis(source.timeout_ms));

        Self {
            url: cache_busted_url(endpoint, next_cache_stamp()),
            headers,
            timeout,
        }
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Append `_t=<stamp>` to `endpoint`, keeping any existing query string and
/// leaving a `#fragment` at the end.
pub fn cache_busted_url(endpoint: &str, stamp: u64) -> String {
    let (base, fragment) = match endpoint.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (endpoint, None),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    let mut url = format!("{base}{separator}{CACHE_BUST_PARAM}={stamp}");
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Reduce a URL to its host (and port), dropping scheme, userinfo, path,
/// query and fragment.
pub fn url_host(url: &str) -> String {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority);
    host.to_string()
}

/// Replace every URL embedded in `text` with its host.
///
/// Error messages from the HTTP client quote the full request URL, which
/// carries the query string and cache stamp.
pub fn redact_urls(text: &str) -> String {
    text.split(' ')
        .map(|word| match word.find("://") {
            Some(scheme_end) => {
                let start = word[..scheme_end]
                    .rfind(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')))
                    .map_or(0, |i| i + 1);
                format!("{}{}", &word[..start], url_host(&word[start..]))
            }
            None => word.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Current unix time in milliseconds, bumped so that every call in this
/// process returns a strictly larger value than the previous one.
pub fn next_cache_stamp() -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut prev = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_STAMP.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Performs a GET and returns the body of a successful (2xx) response.
///
/// Any transport failure or non-success status is an error.
pub trait Transport: Send + Sync {
    fn get(&self, request: &SourceRequest) -> Result<String>;
}

/// Blocking HTTP transport backed by a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: &SourceRequest) -> Result<String> {
        let mut call = self.agent.get(&request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        if let Some(timeout) = request.timeout {
            call = call.timeout(timeout);
        }

        let response = match call.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(anyhow!("HTTP {code} {}", response.status_text()));
            }
            Err(ureq::Error::Transport(transport)) => {
                let detail = transport
                    .message()
                    .map(|m| format!(": {}", redact_urls(m)))
                    .unwrap_or_default();
                return Err(anyhow!(
                    "request to {} failed: {}{detail}",
                    url_host(&request.url),
                    transport.kind()
                ));
            }
        };

        response
            .into_string()
            .context("failed to read data source response body")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_host_strips_everything_but_authority() {
        assert_eq!(url_host("https://stats.test/api?k=1"), "stats.test");
        assert_eq!(
            url_host("http://user:pw@stats.test:8080/m#x"),
            "stats.test:8080"
        );
        assert_eq!(url_host("stats.test/api"), "stats.test");
    }

    #[test]
    fn redact_urls_keeps_only_hosts() {
        let text = "request failed: http://127.0.0.1:4000/m?api_key=SECRET&_t=17: Connection Failed";
        let redacted = redact_urls(text);
        assert_eq!(redacted, "request failed: 127.0.0.1:4000 Connection Failed");
        assert!(!redacted.contains("SECRET"));

        let quoted = redact_urls("bad url \"https://x.test/a?b=c\"");
        assert_eq!(quoted, "bad url \"x.test");
        assert_eq!(redact_urls("no urls here"), "no urls here");
    }

    #[test]
    fn appends_query_when_none_present() {
        assert_eq!(
            cache_busted_url("https://stats.test/api", 42),
            "https://stats.test/api?_t=42"
        );
    }

    #[test]
    fn preserves_existing_query() {
        assert_eq!(
            cache_busted_url("https://stats.test/api?site=main", 42),
            "https://stats.test/api?site=main&_t=42"
        );
        assert_eq!(
            cache_busted_url("https://stats.test/api?", 42),
            "https://stats.test/api?_t=42"
        );
    }

    #[test]
    fn keeps_fragment_last() {
        assert_eq!(
            cache_busted_url("https://stats.test/api?a=1#top", 7),
            "https://stats.test/api?a=1&_t=7#top"
        );
    }

    #[test]
    fn cache_stamps_strictly_increase() {
        let first = next_cache_stamp();
        let second = next_cache_stamp();
        let third = next_cache_stamp();
        assert!(first < second && second < third);
    }

    #[test]
    fn build_sets_json_content_type() {
        let source = SourceConfig::new(Some("https://stats.test"), None);
        let request = SourceRequest::build(&source, "https://stats.test");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("Authorization"), None);
        assert_eq!(request.timeout, None);
    }

    #[test]
    fn build_forwards_bearer_credential() {
        let source = SourceConfig::new(Some("https://stats.test"), Some("abc123"));
        let request = SourceRequest::build(&source, "https://stats.test");
        assert_eq!(request.header("Authorization"), Some("Bearer abc123"));
    }

    #[test]
    fn build_uses_timeout_only_when_set() {
        let mut source = SourceConfig::new(Some("https://stats.test"), None);
        source.timeout_ms = 1500;
        let request = SourceRequest::build(&source, "https://stats.test");
        assert_eq!(request.timeout, Some(Duration::from_millis(1500)));
    }
}

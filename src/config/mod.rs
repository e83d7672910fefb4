/// Configuration system for metrix.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::MetrixConfig::default()`]
/// 2. **User config**: `~/.metrix/config.toml`
/// 3. **Environment variables**: `METRIX_*` overrides (highest precedence)
///
/// The data-source part of the configuration (endpoint and credential) is
/// accessed through the [`ConfigStore`] trait so the reconciliation layer can
/// be driven from a file, from memory in tests, or from anything else that
/// can hand back a [`SourceConfig`].
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

pub use schema::{MetrixConfig, SourceConfig};

// ---------------------------------------------------------------------------
// Config store
// ---------------------------------------------------------------------------

/// Durable storage for the data-source settings.
///
/// `read` never fails: missing or unreadable storage yields absent values.
/// `write` overwrites endpoint and credential unconditionally; an absent value
/// is persisted as an empty string rather than deleting the key.
pub trait ConfigStore: Send + Sync {
    fn read(&self) -> SourceConfig;
    fn write(&self, source: &SourceConfig) -> Result<()>;
}

/// File-backed store over a TOML config file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    env_overrides: bool,
}

impl FileStore {
    /// Store over `~/.metrix/config.toml`, with `METRIX_*` overrides applied
    /// on read.
    pub fn user() -> Result<Self> {
        let path = global_config_path().context("could not determine home directory")?;
        Ok(Self {
            path,
            env_overrides: true,
        })
    }

    /// Store over an explicit file, without environment overrides.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_overrides: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileStore {
    fn read(&self) -> SourceConfig {
        let mut config = MetrixConfig {
            source: read_source_section(&self.path),
            ..MetrixConfig::default()
        };
        if self.env_overrides {
            apply_env_overrides(&mut config);
        }
        config.source.normalized()
    }

    fn write(&self, source: &SourceConfig) -> Result<()> {
        let mut root = read_toml_value(&self.path)?;
        let table = root
            .as_table_mut()
            .context("config root is not a TOML table")?;
        let section = table
            .entry("source")
            .or_insert(toml::Value::Table(toml::map::Map::new()))
            .as_table_mut()
            .context("[source] is not a TOML table")?;

        section.insert(
            "endpoint".to_string(),
            toml::Value::String(source.endpoint().unwrap_or_default().to_string()),
        );
        section.insert(
            "credential".to_string(),
            toml::Value::String(source.credential().unwrap_or_default().to_string()),
        );

        write_toml_value(&self.path, &root)
    }
}

/// In-memory store, used by tests and by embedders that manage persistence
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    source: Mutex<SourceConfig>,
}

impl MemoryStore {
    pub fn new(source: SourceConfig) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self) -> SourceConfig {
        self.source
            .lock()
            .map(|s| s.clone().normalized())
            .unwrap_or_default()
    }

    fn write(&self, source: &SourceConfig) -> Result<()> {
        let mut guard = self
            .source
            .lock()
            .map_err(|_| anyhow::anyhow!("config store lock poisoned"))?;
        guard.endpoint = Some(source.endpoint().unwrap_or_default().to_string());
        guard.credential = Some(source.credential().unwrap_or_default().to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration: defaults → user TOML → env vars.
///
/// The `[source]` section is read on its own, so a type error elsewhere in the
/// file never hides a configured endpoint.
pub fn load() -> MetrixConfig {
    let path = global_config_path();
    let mut config = path
        .as_deref()
        .and_then(load_toml_file)
        .unwrap_or_default();
    if let Some(path) = &path {
        config.source = read_source_section(path);
    }

    apply_env_overrides(&mut config);
    config.source = config.source.normalized();
    config
}

/// Load a TOML config file. Missing or malformed files yield `None`.
fn load_toml_file(path: &Path) -> Option<MetrixConfig> {
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Read `[source]` field by field from the raw TOML.
///
/// String keys are taken when they are strings; `timeout_ms` when it is a
/// non-negative integer. Anything else, including a missing or unparseable
/// file, reads as absent.
fn read_source_section(path: &Path) -> SourceConfig {
    let root = fs::read_to_string(path)
        .ok()
        .and_then(|content| toml::from_str::<toml::Value>(&content).ok());
    let section = root.as_ref().and_then(|root| root.get("source"));
    let field = |key: &str| section.and_then(|s| s.get(key));

    SourceConfig {
        endpoint: field("endpoint")
            .and_then(toml::Value::as_str)
            .map(str::to_string),
        credential: field("credential")
            .and_then(toml::Value::as_str)
            .map(str::to_string),
        timeout_ms: field("timeout_ms")
            .and_then(toml::Value::as_integer)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0),
    }
    .normalized()
}

/// Read a config file as a raw TOML value, or an empty table if it is missing.
fn read_toml_value(path: &Path) -> Result<toml::Value> {
    if !path.exists() {
        return Ok(toml::Value::Table(toml::map::Map::new()));
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).context("failed to parse config as TOML value")
}

fn write_toml_value(path: &Path, root: &toml::Value) -> Result<()> {
    let output = toml::to_string_pretty(root).context("failed to serialize config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).with_context(|| format!("failed to write {}", path.display()))
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user config: `~/.metrix/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    metrix_home().map(|dir| dir.join("config.toml"))
}

/// The `~/.metrix/` directory holding config and logs.
pub fn metrix_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".metrix"))
}

/// Return the path to the user config file for display purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `METRIX_API_URL`: data-source endpoint
/// - `METRIX_API_KEY`: bearer credential
/// - `METRIX_TIMEOUT_MS`: data-source request timeout
/// - `METRIX_INSIGHT`: enable narrative insights (`1`/`true`/`yes`/`on`)
/// - `METRIX_INSIGHT_MODEL`: Ollama model name
/// - `METRIX_INSIGHT_URL`: Ollama base URL
/// - `METRIX_LOG`: fetch-event log on/off
fn apply_env_overrides(config: &mut MetrixConfig) {
    if let Ok(val) = std::env::var("METRIX_API_URL") {
        config.source.endpoint = Some(val);
    }
    if let Ok(val) = std::env::var("METRIX_API_KEY") {
        config.source.credential = Some(val);
    }
    if let Ok(val) = std::env::var("METRIX_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.source.timeout_ms = ms;
    }

    if let Ok(val) = std::env::var("METRIX_INSIGHT") {
        config.insight.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("METRIX_INSIGHT_MODEL")
        && !val.is_empty()
    {
        config.insight.model = val;
    }
    if let Ok(val) = std::env::var("METRIX_INSIGHT_URL")
        && !val.is_empty()
    {
        config.insight.ollama_url = val;
    }

    if let Ok(val) = std::env::var("METRIX_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / show
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.metrix/config.toml`.
///
/// Returns an error if the file already exists unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.metrix/ directory")?;
    }
    fs::write(&path, MetrixConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a dotted key (e.g. `source.endpoint`, `insight.enabled`) in the user
/// config file, creating the file from defaults when it does not exist yet.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

/// Set a dotted key in the config file at `path`.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root = if path.exists() {
        read_toml_value(path)?
    } else {
        toml::from_str(MetrixConfig::default_toml()).context("failed to parse default config")?
    };

    set_toml_value(&mut root, key, value)?;
    write_toml_value(path, &root)
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The existing value's type decides how `raw_value` is parsed; unknown
/// sections are rejected so typos don't silently create dead keys.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let (section_path, leaf) = match key.rsplit_once('.') {
        Some((section, leaf)) if !leaf.is_empty() => (section, leaf),
        _ => anyhow::bail!("config key must be of the form 'section.key', got '{key}'"),
    };

    let mut current = root;
    for part in section_path.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{section_path}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: u64 = raw_value.parse().with_context(|| {
                format!("expected a non-negative integer for '{key}', got '{raw_value}'")
            })?;
            let n = i64::try_from(n).with_context(|| format!("value too large for '{key}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Show the effective (fully resolved) config as TOML with the credential
/// masked.
pub fn show_effective_config() -> Result<String> {
    let mut config = load();
    config.source = config.source.masked();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

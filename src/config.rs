//! Configuration loader and validator for the content sync.
//!
//! Values come from an optional YAML file, then environment variables
//! (optionally via `.env`) fill in or override the source credentials and the
//! publish server URL. Credentials are never compiled in.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::kind::{builtin_kinds, EntryKind};
use crate::source::MAX_PAGE_SIZE;

pub const ENV_SPACE_ID: &str = "CONTENTFUL_SPACE_ID";
pub const ENV_ACCESS_TOKEN: &str = "CONTENTFUL_ACCESS_TOKEN";
pub const ENV_ENVIRONMENT: &str = "CONTENTFUL_ENVIRONMENT";
pub const ENV_PUBLISH_URL: &str = "PUBLISH_BASE_URL";

const DEFAULT_CDN_URL: &str = "https://cdn.contentful.com";
const DEFAULT_PUBLISH_URL: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Invalid URL for {field}: {reason}")]
    Url { field: &'static str, reason: String },
    #[error("Invalid entry kind: {0}")]
    Kind(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    /// Extra entry kinds, or overrides of built-in kinds with the same name.
    #[serde(default)]
    pub kinds: Vec<EntryKind>,
}

/// Content source (Contentful Delivery API) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub access_token: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            cdn_url: default_cdn_url(),
            space_id: String::new(),
            environment: default_environment(),
            access_token: String::new(),
        }
    }
}

/// Downstream publish server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
    #[serde(default = "default_publish_url")]
    pub base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_publish_url(),
        }
    }
}

/// Pacing, retry and timeout knobs. Durations are in milliseconds or seconds
/// as the field name says.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    pub page_size: usize,
    pub page_delay_ms: u64,
    pub item_delay_ms: u64,
    /// Defaults to twice `item_delay_ms`.
    pub batch_delay_ms: Option<u64>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub fetch_timeout_secs: u64,
    pub simple_timeout_secs: u64,
    pub complex_timeout_secs: u64,
    pub preflight: bool,
    pub preflight_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            page_delay_ms: 500,
            item_delay_ms: 2_000,
            batch_delay_ms: None,
            batch_size: 5,
            max_retries: 3,
            retry_delay_ms: 2_000,
            fetch_timeout_secs: 30,
            simple_timeout_secs: 30,
            complex_timeout_secs: 60,
            preflight: true,
            preflight_timeout_secs: 10,
        }
    }
}

impl SyncSettings {
    /// Settings with every pause set to zero, for tests and previews.
    pub fn without_delays() -> Self {
        Self {
            page_delay_ms: 0,
            item_delay_ms: 0,
            batch_delay_ms: Some(0),
            retry_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(
            self.batch_delay_ms
                .unwrap_or_else(|| self.item_delay_ms.saturating_mul(2)),
        )
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn simple_timeout(&self) -> Duration {
        Duration::from_secs(self.simple_timeout_secs)
    }

    pub fn complex_timeout(&self) -> Duration {
        Duration::from_secs(self.complex_timeout_secs)
    }

    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_secs(self.preflight_timeout_secs)
    }
}

fn default_cdn_url() -> String {
    DEFAULT_CDN_URL.to_string()
}

fn default_environment() -> String {
    "master".to_string()
}

fn default_publish_url() -> String {
    DEFAULT_PUBLISH_URL.to_string()
}

impl Config {
    /// Fill in or override values from the environment via `lookup`.
    /// Blank variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_SPACE_ID) {
            self.source.space_id = v;
        }
        if let Some(v) = get(ENV_ACCESS_TOKEN) {
            self.source.access_token = v;
        }
        if let Some(v) = get(ENV_ENVIRONMENT) {
            self.source.environment = v;
        }
        if let Some(v) = get(ENV_PUBLISH_URL) {
            self.target.base_url = v;
        }
    }

    /// Built-in kinds with configured kinds layered on top (same name replaces).
    pub fn all_kinds(&self) -> Vec<EntryKind> {
        let mut kinds = builtin_kinds();
        for custom in &self.kinds {
            match kinds
                .iter_mut()
                .find(|k| k.name.eq_ignore_ascii_case(&custom.name))
            {
                Some(existing) => *existing = custom.clone(),
                None => kinds.push(custom.clone()),
            }
        }
        kinds
    }
}

/// Read a YAML file (or defaults when `path` is None) and overlay the
/// process environment. Callers apply their own overrides, then [`validate`].
pub fn read(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Config::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    Ok(cfg)
}

/// Parse a base URL, ensuring it ends with `/` so relative joins keep its path.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| format!("{raw}: {e}"))
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.source.space_id.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "source.space_id must be non-empty (or set CONTENTFUL_SPACE_ID)",
        ));
    }
    if cfg.source.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "source.access_token must be non-empty (or set CONTENTFUL_ACCESS_TOKEN)",
        ));
    }
    if cfg.source.environment.trim().is_empty() {
        return Err(ConfigError::Invalid("source.environment must be non-empty"));
    }
    parse_base_url(&cfg.source.cdn_url).map_err(|reason| ConfigError::Url {
        field: "source.cdn_url",
        reason,
    })?;

    if cfg.target.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("target.base_url must be non-empty"));
    }
    parse_base_url(&cfg.target.base_url).map_err(|reason| ConfigError::Url {
        field: "target.base_url",
        reason,
    })?;

    let s = &cfg.sync;
    if s.page_size == 0 || s.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Invalid("sync.page_size must be between 1 and 100"));
    }
    if s.batch_size == 0 {
        return Err(ConfigError::Invalid("sync.batch_size must be > 0"));
    }
    if s.fetch_timeout_secs == 0 || s.simple_timeout_secs == 0 || s.complex_timeout_secs == 0 {
        return Err(ConfigError::Invalid("sync timeouts must be > 0"));
    }

    for kind in &cfg.kinds {
        if let Some(problem) = kind.problems().into_iter().next() {
            return Err(ConfigError::Kind(problem));
        }
    }

    Ok(())
}

/// Example configuration file.
pub fn example() -> &'static str {
    r#"source:
  cdn_url: "https://cdn.contentful.com"
  # Prefer CONTENTFUL_SPACE_ID / CONTENTFUL_ACCESS_TOKEN in the environment.
  space_id: "YOUR_SPACE_ID"
  environment: "master"
  access_token: "YOUR_DELIVERY_TOKEN"

target:
  base_url: "http://localhost:3000"

sync:
  page_size: 100
  page_delay_ms: 500
  item_delay_ms: 2000
  batch_size: 5
  max_retries: 3
  retry_delay_ms: 2000
  simple_timeout_secs: 30
  complex_timeout_secs: 60
  preflight: true

kinds:
  - name: "guide"
    content_type: "gardenGuide"
    include: 1
    render_flag: true
    legacy_path: "render-and-submit-guide/{id}"
    complexity: "complex"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn example_cfg() -> Config {
        serde_yaml::from_str(example()).unwrap()
    }

    #[test]
    fn parse_example_ok() {
        let cfg = example_cfg();
        validate(&cfg).unwrap();
        assert_eq!(cfg.sync.batch_delay(), Duration::from_millis(4_000));
        assert_eq!(cfg.sync.complex_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn defaults_match_documented_values() {
        let s = SyncSettings::default();
        assert_eq!(s.page_size, 100);
        assert_eq!(s.item_delay(), Duration::from_secs(2));
        assert_eq!(s.batch_delay(), Duration::from_secs(4));
        assert_eq!(s.max_retries, 3);
        assert_eq!(s.simple_timeout(), Duration::from_secs(30));
        assert_eq!(s.complex_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn env_fills_missing_credentials() {
        let mut cfg = Config::default();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(msg)) if msg.contains("space_id")));

        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SPACE_ID, "space-from-env"),
            (ENV_ACCESS_TOKEN, "token-from-env"),
            (ENV_ENVIRONMENT, "  "),
        ]);
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.source.space_id, "space-from-env");
        assert_eq!(cfg.source.environment, "master");
        validate(&cfg).unwrap();
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = example_cfg();
        cfg.apply_env(|k| (k == ENV_PUBLISH_URL).then(|| "http://publisher:8080".to_string()));
        assert_eq!(cfg.target.base_url, "http://publisher:8080");
        assert_eq!(cfg.source.space_id, "YOUR_SPACE_ID");
    }

    #[test]
    fn invalid_access_token() {
        let mut cfg = example_cfg();
        cfg.source.access_token = "".into();
        match validate(&cfg).unwrap_err() {
            ConfigError::Invalid(msg) => assert!(msg.contains("access_token")),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn invalid_sync_settings() {
        let mut cfg = example_cfg();
        cfg.sync.page_size = 101;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(msg)) if msg.contains("page_size")));

        let mut cfg = example_cfg();
        cfg.sync.batch_size = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = example_cfg();
        cfg.target.base_url = "::nope".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Url { field: "target.base_url", .. })));
    }

    #[test]
    fn invalid_custom_kind() {
        let mut cfg = example_cfg();
        cfg.kinds[0].legacy_path = "no-placeholder".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Kind(_))));
    }

    #[test]
    fn custom_kinds_extend_and_override_builtins() {
        let mut cfg = example_cfg();
        let mut faq = EntryKind::faq();
        faq.include = 3;
        cfg.kinds.push(faq);
        let kinds = cfg.all_kinds();
        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds.iter().find(|k| k.name == "faq").unwrap().include, 3);
        assert!(kinds.iter().any(|k| k.name == "guide"));
    }

    #[test]
    fn read_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("content-sync.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = read(Some(&p)).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.sync.batch_size, 5);
        assert_eq!(cfg.kinds.len(), 1);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = read(Some(&td.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

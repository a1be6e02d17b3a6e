//! Configuration types for the aggregation engine and its collaborators.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

/// Which of several matching occurrences a token strategy returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrencePolicy {
    /// The first occurrence in document order.
    First,
    /// The last occurrence in document order. Pagination controls usually
    /// render the "next" control last.
    #[default]
    Last,
}

impl OccurrencePolicy {
    /// Picks one item out of a document-ordered sequence.
    pub fn pick<T>(self, mut items: impl Iterator<Item = T>) -> Option<T> {
        match self {
            Self::First => items.next(),
            Self::Last => items.last(),
        }
    }
}

/// Spacing between outgoing fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Minimum interval between fetch attempts in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    2_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl PacingConfig {
    /// Gets the minimum interval as Duration.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Cache lifetime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of an aggregated entry in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_ttl_ms() -> u64 {
    300_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
        }
    }
}

impl CacheConfig {
    /// Gets the TTL as Duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Configuration for record parsing and token extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Origin used to absolutize relative links.
    #[serde(default = "default_site_origin")]
    pub site_origin: String,
    /// CSS selectors for result cards, tried in order.
    #[serde(default = "default_card_selectors")]
    pub card_selectors: Vec<String>,
    /// CSS selectors for the name/profile anchor inside a card.
    #[serde(default = "default_name_selectors")]
    pub name_selectors: Vec<String>,
    /// Localized labels of the "next page" control.
    #[serde(default = "default_next_labels")]
    pub next_labels: Vec<String>,
    /// Bytes searched on each side of a "next" label.
    #[serde(default = "default_label_window")]
    pub label_window: usize,
    /// Which `after_author`/`start` occurrence wins.
    #[serde(default)]
    pub occurrence_policy: OccurrencePolicy,
}

fn default_site_origin() -> String {
    "https://scholar.google.com".to_string()
}

fn default_card_selectors() -> Vec<String> {
    vec![".gsc_1usr".to_string(), ".gs_ai_chpr".to_string()]
}

fn default_name_selectors() -> Vec<String> {
    vec![
        ".gs_ai_name a".to_string(),
        "h3 a".to_string(),
        "a.gs_ai_pho".to_string(),
    ]
}

fn default_next_labels() -> Vec<String> {
    [
        "Next", "Suivant", "Weiter", "Siguiente", "Próxima", "Successivo", "Avanti",
        "Volgende", "Dalej", "Следующая", "下一页", "次へ", "다음",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_label_window() -> usize {
    400
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            site_origin: default_site_origin(),
            card_selectors: default_card_selectors(),
            name_selectors: default_name_selectors(),
            next_labels: default_next_labels(),
            label_window: default_label_window(),
            occurrence_policy: OccurrencePolicy::default(),
        }
    }
}

impl ExtractionConfig {
    /// Creates a new extraction configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the site origin.
    #[must_use]
    pub fn with_site_origin(mut self, origin: impl Into<String>) -> Self {
        self.site_origin = origin.into();
        self
    }

    /// Adds a "next" label.
    #[must_use]
    pub fn with_next_label(mut self, label: impl Into<String>) -> Self {
        self.next_labels.push(label.into());
        self
    }

    /// Overrides the occurrence policy.
    #[must_use]
    pub fn with_occurrence_policy(mut self, policy: OccurrencePolicy) -> Self {
        self.occurrence_policy = policy;
        self
    }
}

/// Display pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Records per display page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    10
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Configuration for the HTTP fetch collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL of the search site.
    #[serde(default = "default_site_origin")]
    pub base_url: String,
    /// Interface language passed as `hl`.
    #[serde(default = "default_language")]
    pub language: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout() -> f64 {
    20.0
}

fn default_user_agent() -> String {
    concat!("namesake/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_site_origin(),
            language: default_language(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the interface language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }
}

/// Combined configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamesakeConfig {
    /// Fetch spacing.
    #[serde(default)]
    pub pacing: PacingConfig,
    /// Cache lifetime.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Parsing and token extraction.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Display pagination.
    #[serde(default)]
    pub panel: PanelConfig,
    /// HTTP fetching.
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl NamesakeConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.panel.page_size == 0 {
            return Err(ConfigError::Invalid("panel.page_size must be at least 1".into()));
        }
        if self.cache.ttl_ms == 0 {
            return Err(ConfigError::Invalid("cache.ttl_ms must be at least 1".into()));
        }
        if url::Url::parse(&self.extraction.site_origin).is_err() {
            return Err(ConfigError::Invalid(format!(
                "extraction.site_origin is not a URL: {}",
                self.extraction.site_origin
            )));
        }
        if self.extraction.card_selectors.is_empty() {
            return Err(ConfigError::Invalid(
                "extraction.card_selectors must not be empty".into(),
            ));
        }
        if !self.fetch.timeout_seconds.is_finite() || self.fetch.timeout_seconds <= 0.0 {
            return Err(ConfigError::Invalid(
                "fetch.timeout_seconds must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Sets the minimum fetch interval.
    #[must_use]
    pub fn with_min_interval_ms(mut self, ms: u64) -> Self {
        self.pacing.min_interval_ms = ms;
        self
    }

    /// Sets the cache TTL.
    #[must_use]
    pub fn with_ttl_ms(mut self, ms: u64) -> Self {
        self.cache.ttl_ms = ms;
        self
    }

    /// Sets the display page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.panel.page_size = page_size;
        self
    }

    /// Replaces the extraction configuration.
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NamesakeConfig::default();
        assert_eq!(config.pacing.min_interval(), Duration::from_secs(2));
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.panel.page_size, 10);
        assert_eq!(config.extraction.occurrence_policy, OccurrencePolicy::Last);
        assert!(config.extraction.next_labels.contains(&"Next".to_string()));
    }

    #[test]
    fn test_occurrence_policy_pick() {
        assert_eq!(OccurrencePolicy::First.pick([1, 2, 3].into_iter()), Some(1));
        assert_eq!(OccurrencePolicy::Last.pick([1, 2, 3].into_iter()), Some(3));
        assert_eq!(OccurrencePolicy::Last.pick(std::iter::empty::<u8>()), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = NamesakeConfig::from_json(
            r#"{"pacing": {"min_interval_ms": 500}, "extraction": {"occurrence_policy": "first"}}"#,
        )
        .unwrap();

        assert_eq!(config.pacing.min_interval_ms, 500);
        assert_eq!(config.cache.ttl_ms, 300_000);
        assert_eq!(config.extraction.occurrence_policy, OccurrencePolicy::First);
        assert_eq!(config.extraction.site_origin, "https://scholar.google.com");
    }

    #[test]
    fn test_validation_rejects_zero_page_size() {
        let err = NamesakeConfig::from_json(r#"{"panel": {"page_size": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validation_rejects_relative_origin() {
        let config = NamesakeConfig::default()
            .with_extraction(ExtractionConfig::default().with_site_origin("scholar.google.com"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cache": {{"ttl_ms": 1000}}}}"#).unwrap();

        let config = NamesakeConfig::from_path(file.path()).unwrap();
        assert_eq!(config.cache.ttl_ms, 1000);
    }

    #[test]
    fn test_json_roundtrip_keeps_overrides() {
        let config = NamesakeConfig::new().with_page_size(25).with_min_interval_ms(0);
        let restored = NamesakeConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored.panel.page_size, 25);
        assert_eq!(restored.pacing.min_interval_ms, 0);
    }

    #[test]
    fn test_fetch_config_builder() {
        let config = FetchConfig::new()
            .with_language("fr")
            .with_timeout(5.0)
            .with_header("Cookie", "a=b");

        assert_eq!(config.language, "fr");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.headers.get("Cookie"), Some(&"a=b".to_string()));
    }
}

//! Pagination token extraction.
//!
//! The upstream markup has no stable pagination contract, so the token is
//! recovered by an ordered list of independent [`TokenStrategy`] values.
//! The first strategy that returns a token wins.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::{ExtractionConfig, OccurrencePolicy};
use crate::models::PaginationToken;

#[allow(clippy::expect_used)]
static AFTER_AUTHOR_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bafter_author=([^&"'\s<>\\#]+)"#).expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static CSTART_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bcstart=(\d+)").expect("hardcoded regex pattern is valid"));

#[allow(clippy::expect_used)]
static START_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bstart=(\d+)").expect("hardcoded regex pattern is valid"));

/// Elements that can act as a "next page" control.
const NEXT_CONTROL_SELECTORS: &[&str] = &["button", "a", "[onclick]"];

/// Attributes that may carry the navigation target of a control.
const HANDLER_ATTRIBUTES: &[&str] = &["onclick", "data-href", "data-url", "href", "formaction"];

/// Class/id fragments marking a pagination control.
const NEXT_CONTROL_MARKERS: &[&str] = &["gs_btnpr", "gsc_pgn_pnx", "pgn", "pagination", "next"];

/// One independent way of finding a pagination token.
pub trait TokenStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Looks for a token in entity-normalized HTML.
    fn extract(&self, html: &str) -> Option<PaginationToken>;
}

/// Replaces `&amp;` with `&` so double-encoded query strings match.
#[must_use]
pub fn normalize_entities(html: &str) -> String {
    html.replace("&amp;", "&")
}

/// Decodes JavaScript and percent escapes of `=` and `&` inside handler code.
#[must_use]
pub fn decode_handler_escapes(value: &str) -> String {
    value
        .replace("\\x3d", "=")
        .replace("\\x3D", "=")
        .replace("\\x26", "&")
        .replace("\\u003d", "=")
        .replace("\\u003D", "=")
        .replace("\\u0026", "&")
        .replace("%3D", "=")
        .replace("%3d", "=")
        .replace("%26", "&")
        .replace("&amp;", "&")
}

fn after_author_values(text: &str) -> impl Iterator<Item = &str> {
    AFTER_AUTHOR_PARAM
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `after_author=...` anywhere in attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct AfterAuthorParamStrategy {
    policy: OccurrencePolicy,
}

impl AfterAuthorParamStrategy {
    /// Creates the strategy with an occurrence policy.
    #[must_use]
    pub const fn new(policy: OccurrencePolicy) -> Self {
        Self { policy }
    }
}

impl TokenStrategy for AfterAuthorParamStrategy {
    fn name(&self) -> &'static str {
        "after_author_param"
    }

    fn extract(&self, html: &str) -> Option<PaginationToken> {
        self.policy
            .pick(after_author_values(html))
            .map(|value| PaginationToken::AfterAuthor(value.to_string()))
    }
}

/// First `cstart=N` parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CstartParamStrategy;

impl TokenStrategy for CstartParamStrategy {
    fn name(&self) -> &'static str {
        "cstart_param"
    }

    fn extract(&self, html: &str) -> Option<PaginationToken> {
        CSTART_PARAM
            .captures_iter(html)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .next()
            .map(PaginationToken::Cstart)
    }
}

/// `start=N` parameter with N > 0. `start=0` names the first page.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartParamStrategy {
    policy: OccurrencePolicy,
}

impl StartParamStrategy {
    /// Creates the strategy with an occurrence policy.
    #[must_use]
    pub const fn new(policy: OccurrencePolicy) -> Self {
        Self { policy }
    }
}

impl TokenStrategy for StartParamStrategy {
    fn name(&self) -> &'static str {
        "start_param"
    }

    fn extract(&self, html: &str) -> Option<PaginationToken> {
        let offsets = START_PARAM
            .captures_iter(html)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .filter(|n| *n > 0);
        self.policy.pick(offsets).map(PaginationToken::Start)
    }
}

/// Handler attributes of "next"/pagination buttons.
///
/// Catches targets written as JavaScript with escaped separators, e.g.
/// `onclick="window.location='/citations?...\x26after_author\x3dXYZ'"`.
#[derive(Debug, Clone)]
pub struct NextButtonStrategy {
    policy: OccurrencePolicy,
    labels: Vec<String>,
}

impl NextButtonStrategy {
    /// Creates the strategy. `labels` also mark a control via `aria-label`.
    #[must_use]
    pub fn new(policy: OccurrencePolicy, labels: Vec<String>) -> Self {
        Self {
            policy,
            labels: labels.into_iter().map(|l| l.to_lowercase()).collect(),
        }
    }

    fn is_next_control(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();
        let marker_text = format!(
            "{} {}",
            value.attr("class").unwrap_or_default(),
            value.id().unwrap_or_default()
        )
        .to_lowercase();
        if NEXT_CONTROL_MARKERS.iter().any(|m| marker_text.contains(m)) {
            return true;
        }

        value.attr("aria-label").is_some_and(|label| {
            let label = label.trim().to_lowercase();
            self.labels.iter().any(|l| label == *l || label.starts_with(l.as_str()))
        })
    }

    fn handler_token(element: &ElementRef<'_>) -> Option<String> {
        HANDLER_ATTRIBUTES
            .iter()
            .filter_map(|attr| element.value().attr(attr))
            .find_map(|raw| {
                let decoded = decode_handler_escapes(raw);
                after_author_values(&decoded).last().map(String::from)
            })
    }
}

impl TokenStrategy for NextButtonStrategy {
    fn name(&self) -> &'static str {
        "next_button"
    }

    fn extract(&self, html: &str) -> Option<PaginationToken> {
        let document = Html::parse_document(html);
        let mut found = Vec::new();

        for pattern in NEXT_CONTROL_SELECTORS {
            let Ok(selector) = Selector::parse(pattern) else {
                continue;
            };
            for element in document.select(&selector) {
                if !self.is_next_control(&element) {
                    continue;
                }
                if let Some(token) = Self::handler_token(&element) {
                    found.push((element.id(), token));
                }
            }
        }

        // The same element may match more than one selector.
        let mut seen = std::collections::HashSet::new();
        found.retain(|(id, _)| seen.insert(*id));

        self.policy
            .pick(found.into_iter().map(|(_, token)| token))
            .map(PaginationToken::AfterAuthor)
    }
}

/// Continuation parameter close to a localized "Next" label.
#[derive(Debug, Clone)]
pub struct NextLabelStrategy {
    label_pattern: Option<Regex>,
    window: usize,
}

impl NextLabelStrategy {
    /// Creates the strategy, searching `window` bytes on each side of a label.
    #[must_use]
    pub fn new(labels: &[String], window: usize) -> Self {
        let alternatives: Vec<String> = labels
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| regex::escape(l.trim()))
            .collect();

        let label_pattern = if alternatives.is_empty() {
            None
        } else {
            match Regex::new(&format!("(?i)(?:{})", alternatives.join("|"))) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(error = %e, "Could not build next-label pattern; strategy disabled");
                    None
                }
            }
        };

        Self {
            label_pattern,
            window,
        }
    }
}

impl TokenStrategy for NextLabelStrategy {
    fn name(&self) -> &'static str {
        "next_label"
    }

    fn extract(&self, html: &str) -> Option<PaginationToken> {
        let pattern = self.label_pattern.as_ref()?;

        pattern.find_iter(html).find_map(|label| {
            let start = floor_char_boundary(html, label.start().saturating_sub(self.window));
            let end = ceil_char_boundary(html, label.end().saturating_add(self.window));
            let decoded = decode_handler_escapes(&html[start..end]);
            nearest_to(&decoded, label.start() - start)
        })
    }
}

/// Picks the `after_author` value whose match starts closest to `anchor`.
fn nearest_to(text: &str, anchor: usize) -> Option<PaginationToken> {
    AFTER_AUTHOR_PARAM
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .min_by_key(|m| m.start().abs_diff(anchor))
        .map(|m| PaginationToken::AfterAuthor(m.as_str().to_string()))
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Ordered cascade of token strategies.
#[derive(Debug)]
pub struct TokenExtractor {
    strategies: Vec<Box<dyn TokenStrategy>>,
}

impl TokenExtractor {
    /// Creates an extractor with no strategies.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Creates the standard cascade from configuration.
    #[must_use]
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let policy = config.occurrence_policy;
        Self::empty()
            .with_strategy(AfterAuthorParamStrategy::new(policy))
            .with_strategy(CstartParamStrategy)
            .with_strategy(StartParamStrategy::new(policy))
            .with_strategy(NextButtonStrategy::new(policy, config.next_labels.clone()))
            .with_strategy(NextLabelStrategy::new(&config.next_labels, config.label_window))
    }

    /// Appends a strategy after the existing ones.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl TokenStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Names of the strategies in the order they are tried.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Recovers the continuation token of a result page, if any.
    ///
    /// Absent means the results are exhausted. Never fails on malformed HTML.
    #[must_use]
    pub fn extract(&self, html: &str) -> Option<PaginationToken> {
        let normalized = normalize_entities(html);

        for strategy in &self.strategies {
            if let Some(token) = strategy.extract(&normalized) {
                debug!(strategy = strategy.name(), token = %token, "Pagination token found");
                return Some(token);
            }
        }

        debug!("No pagination token found");
        None
    }
}

impl Default for TokenExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

/// Extracts a token with the default strategy cascade.
#[must_use]
pub fn extract_token(html: &str) -> Option<PaginationToken> {
    TokenExtractor::default().extract(html)
}

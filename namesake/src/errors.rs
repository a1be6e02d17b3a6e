//! Error types for the namesake engine.
//!
//! Fetch-level failures carry an [`ErrorKind`] so callers can tell upstream
//! throttling and challenge pages apart from plain transport failures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Classification of a failed fetch or orchestration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream throttling (HTTP 429). Recoverable after waiting.
    RateLimited,
    /// Upstream challenge page. Recoverable only by a human solving it.
    Captcha,
    /// Transport or HTTP failure. Recoverable by retry.
    NetworkError,
    /// Unclassified failure during orchestration.
    Unknown,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Captcha => "captcha",
            Self::NetworkError => "network_error",
            Self::Unknown => "unknown",
        }
    }

    /// Hint shown next to the error message, if this kind has one.
    #[must_use]
    pub const fn retry_hint(self) -> Option<&'static str> {
        match self {
            Self::RateLimited => Some("Too many requests were sent. Wait a moment, then retry."),
            Self::Captcha => Some(
                "The search site is asking for a CAPTCHA. Solve it in a browser tab, then retry later.",
            ),
            Self::NetworkError | Self::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct FetchFailure {
    /// The failure classification.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl FetchFailure {
    /// Creates a new failure.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a rate-limited failure.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// Creates a CAPTCHA failure.
    #[must_use]
    pub fn captcha(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Captcha, message)
    }

    /// Creates a network failure.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    /// Creates an unclassified failure.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("errorKind".to_string(), serde_json::json!(self.kind.as_str()));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(hint) = self.kind.retry_hint() {
            map.insert("hint".to_string(), serde_json::json!(hint));
        }
        map
    }
}

/// Reasons a `load_more` call did not extend the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadMoreError {
    /// The session has no continuation token.
    #[error("No more results to load")]
    NoMoreResults,

    /// Another `load_more` is still running.
    #[error("A load is already in progress")]
    InFlight,

    /// There is no populated session to extend.
    #[error("No populated search to extend")]
    NotReady,

    /// A newer search replaced the session while the page was loading.
    #[error("Search was replaced before the page arrived")]
    Superseded,

    /// The page fetch failed. Already loaded records are kept.
    #[error("{0}")]
    Fetch(#[from] FetchFailure),
}

/// Errors raised when encoding or decoding cache entries.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The flat text encoding could not be produced or parsed.
    #[error("Cache entry encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors raised while loading configuration or building collaborators.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text is not valid JSON for the schema.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value is out of range or inconsistent.
    #[error("Invalid configuration value: {0}")]
    Invalid(String),

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_wire_names() {
        assert_eq!(ErrorKind::RateLimited.as_str(), "rate_limited");
        assert_eq!(ErrorKind::Captcha.to_string(), "captcha");
        assert_eq!(
            serde_json::to_value(ErrorKind::NetworkError).unwrap(),
            serde_json::json!("network_error")
        );
        assert_eq!(
            serde_json::from_str::<ErrorKind>("\"unknown\"").unwrap(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_retry_hint_only_for_wait_kinds() {
        assert!(ErrorKind::RateLimited.retry_hint().is_some());
        assert!(ErrorKind::Captcha.retry_hint().is_some());
        assert!(ErrorKind::NetworkError.retry_hint().is_none());
        assert!(ErrorKind::Unknown.retry_hint().is_none());
    }

    #[test]
    fn test_fetch_failure_display_and_dict() {
        let err = FetchFailure::rate_limited("HTTP 429");
        assert_eq!(err.to_string(), "rate_limited: HTTP 429");

        let dict = err.to_dict();
        assert_eq!(dict.get("errorKind").unwrap(), "rate_limited");
        assert!(dict.contains_key("hint"));

        let dict = FetchFailure::network("timeout").to_dict();
        assert!(!dict.contains_key("hint"));
    }

    #[test]
    fn test_load_more_error_wraps_fetch_failure() {
        let err: LoadMoreError = FetchFailure::captcha("unusual traffic").into();
        assert!(matches!(err, LoadMoreError::Fetch(ref f) if f.kind == ErrorKind::Captcha));
        assert_eq!(LoadMoreError::NoMoreResults.to_string(), "No more results to load");
    }
}

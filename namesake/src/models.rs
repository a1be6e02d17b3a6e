//! Data models for search results and pagination tokens.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// One matched author profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Display name.
    pub name: String,
    /// Affiliation line, empty when the card has none.
    #[serde(default)]
    pub affiliation: String,
    /// Absolute profile URL.
    pub profile_url: String,
    /// Identifier parsed from the profile URL.
    pub subject_id: Option<String>,
    /// Verified contact domain.
    pub contact_domain: Option<String>,
    /// Citation count.
    pub citation_count: Option<u64>,
    /// Absolute thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Research interest labels, in card order.
    #[serde(default)]
    pub interests: Vec<String>,
}

impl ResultRecord {
    /// Creates a record, deriving `subject_id` from the profile URL.
    #[must_use]
    pub fn new(name: impl Into<String>, profile_url: impl Into<String>) -> Self {
        let profile_url = profile_url.into();
        Self {
            name: name.into(),
            subject_id: subject_id_from_url(&profile_url),
            profile_url,
            ..Default::default()
        }
    }

    /// Sets the affiliation.
    #[must_use]
    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = affiliation.into();
        self
    }

    /// Sets the contact domain.
    #[must_use]
    pub fn with_contact_domain(mut self, domain: impl Into<String>) -> Self {
        self.contact_domain = Some(domain.into());
        self
    }

    /// Sets the citation count.
    #[must_use]
    pub fn with_citation_count(mut self, count: u64) -> Self {
        self.citation_count = Some(count);
        self
    }

    /// Sets the thumbnail URL.
    #[must_use]
    pub fn with_thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Sets the interest labels.
    #[must_use]
    pub fn with_interests(mut self, interests: Vec<String>) -> Self {
        self.interests = interests;
        self
    }

    /// Whether both records describe the same profile.
    ///
    /// Records without a subject id are never considered the same entity.
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        match (&self.subject_id, &other.subject_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("name".to_string(), serde_json::json!(self.name));
        dict.insert("affiliation".to_string(), serde_json::json!(self.affiliation));
        dict.insert("profileUrl".to_string(), serde_json::json!(self.profile_url));
        dict.insert("subjectId".to_string(), serde_json::json!(self.subject_id));
        if let Some(ref v) = self.contact_domain {
            dict.insert("contactDomain".to_string(), serde_json::json!(v));
        }
        if let Some(v) = self.citation_count {
            dict.insert("citationCount".to_string(), serde_json::json!(v));
        }
        if let Some(ref v) = self.thumbnail_url {
            dict.insert("thumbnailUrl".to_string(), serde_json::json!(v));
        }
        dict.insert("interests".to_string(), serde_json::json!(self.interests));
        dict
    }
}

/// Parses the `user` query parameter out of a profile URL.
///
/// Relative URLs are accepted; only the query matters.
#[must_use]
pub fn subject_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse("http://localhost/").ok()?.join(url.trim()).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Continuation marker for the next result page.
///
/// Serializes as `{"cstart": 40}`, `{"start": 10}` or
/// `{"after_author": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationToken {
    /// Offset into a profile's listing.
    Cstart(u32),
    /// Offset into a result listing. Always greater than zero.
    Start(u32),
    /// Opaque cursor for author search results.
    AfterAuthor(String),
}

impl PaginationToken {
    /// Query parameter name carrying this token.
    #[must_use]
    pub const fn param_name(&self) -> &'static str {
        match self {
            Self::Cstart(_) => "cstart",
            Self::Start(_) => "start",
            Self::AfterAuthor(_) => "after_author",
        }
    }

    /// Raw parameter value.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Cstart(n) | Self::Start(n) => n.to_string(),
            Self::AfterAuthor(cursor) => cursor.clone(),
        }
    }

    /// Encoded `name=value` pair ready to append to a query string.
    #[must_use]
    pub fn to_query_pair(&self) -> String {
        format!("{}={}", self.param_name(), urlencoding::encode(&self.value()))
    }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.param_name(), self.value())
    }
}

//! Protocol for retrieving raw search result pages.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::FetchFailure;
use crate::models::PaginationToken;

/// One fetched page of raw search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// Raw HTML body.
    pub html: String,
    /// Continuation token reported by the fetcher itself.
    ///
    /// Advisory only: the engine extracts a token from `html` and uses this
    /// value only when extraction finds none.
    pub next_token: Option<PaginationToken>,
}

impl FetchedPage {
    /// Creates a page from its HTML.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            next_token: None,
        }
    }

    /// Sets the advisory continuation token.
    #[must_use]
    pub fn with_next_token(mut self, token: PaginationToken) -> Self {
        self.next_token = Some(token);
        self
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("html_len".to_string(), serde_json::json!(self.html.len()));
        dict.insert("next_token".to_string(), serde_json::json!(self.next_token));
        dict
    }
}

/// Protocol for fetching search result pages.
///
/// Implementations encode the token into the request by kind and classify
/// failures into [`crate::errors::ErrorKind`] values. They never retry.
#[async_trait]
pub trait SearchFetcher: Send + Sync {
    /// Fetches the page for `subject`, starting at `token` when given.
    async fn fetch(
        &self,
        subject: &str,
        token: Option<&PaginationToken>,
    ) -> Result<FetchedPage, FetchFailure>;
}

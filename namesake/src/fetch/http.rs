//! reqwest-backed search fetcher.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use super::classify::{build_search_url, classify_response};
use super::protocols::{FetchedPage, SearchFetcher};
use crate::config::FetchConfig;
use crate::errors::FetchFailure;
use crate::models::PaginationToken;

/// Fetches author-search pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSearchFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpSearchFetcher {
    /// Creates a fetcher, building a client from `config`.
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(build_headers(&config))
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub fn with_client(client: Client, config: FetchConfig) -> Self {
        Self { client, config }
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn build_headers(config: &FetchConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %key, "Ignoring invalid header"),
        }
    }
    headers
}

fn map_transport_error(err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        FetchFailure::network(format!("connection failed: {err}"))
    } else {
        FetchFailure::network(err.to_string())
    }
}

#[async_trait]
impl SearchFetcher for HttpSearchFetcher {
    async fn fetch(
        &self,
        subject: &str,
        token: Option<&PaginationToken>,
    ) -> Result<FetchedPage, FetchFailure> {
        let url = build_search_url(&self.config, subject, token);
        debug!(url = %url, "Fetching search page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| map_transport_error(&e))?;

        classify_response(status, &body)?;
        debug!(url = %url, status, bytes = body.len(), "Fetched search page");
        Ok(FetchedPage::new(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_headers_are_skipped() {
        let config = FetchConfig::default()
            .with_header("Accept-Language", "en-US")
            .with_header("bad header", "x");
        let headers = build_headers(&config);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["accept-language"], "en-US");
    }

    #[test]
    fn test_new_keeps_config() {
        let fetcher = HttpSearchFetcher::new(FetchConfig::default().with_language("fr")).unwrap();
        assert_eq!(fetcher.config().language, "fr");
    }
}

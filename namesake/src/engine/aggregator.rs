//! The aggregation engine: search, load-more and retry over one session.

use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::session::AggregatedSession;
use super::state::{EngineState, LoadMoreOutcome, SearchOutcome};
use crate::cache::{CacheStore, InMemoryCacheStore};
use crate::config::NamesakeConfig;
use crate::errors::{ConfigError, FetchFailure, LoadMoreError};
use crate::extraction::{RecordParser, TokenExtractor};
use crate::fetch::SearchFetcher;
use crate::models::{PaginationToken, ResultRecord};
use crate::observability::{NoOpPanelObserver, PanelObserver, PanelUpdate};
use crate::pacing::RateLimiter;
use crate::utils::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct SearchRequest {
    subject: String,
    exclude_id: Option<String>,
}

#[derive(Debug, Default)]
struct EngineInner {
    state: EngineState,
    session: Option<AggregatedSession>,
    generation: u64,
    last_request: Option<SearchRequest>,
}

impl EngineInner {
    fn owns(&self, generation: u64, session_id: Uuid) -> bool {
        self.generation == generation
            && self.session.as_ref().is_some_and(|s| s.id() == session_id)
    }

    fn populated_update(&self) -> PanelUpdate {
        let (records, has_more) = self
            .session
            .as_ref()
            .map_or_else(|| (Vec::new(), false), |s| (s.records().to_vec(), s.has_more()));
        PanelUpdate::Populated { records, has_more }
    }
}

/// Orchestrates fetching, parsing, merging and caching for one panel.
///
/// All mutable state sits behind one lock that is never held across an
/// await. Every search bumps a generation counter; a fetch that resolves
/// after a newer search started is dropped.
pub struct AggregationEngine {
    fetcher: Arc<dyn SearchFetcher>,
    cache: Arc<dyn CacheStore>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn PanelObserver>,
    parser: RecordParser,
    extractor: TokenExtractor,
    page_size: usize,
    inner: Mutex<EngineInner>,
}

impl std::fmt::Debug for AggregationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("AggregationEngine")
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .field("records", &inner.session.as_ref().map_or(0, AggregatedSession::len))
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl AggregationEngine {
    /// Starts building an engine around `fetcher`.
    #[must_use]
    pub fn builder(fetcher: Arc<dyn SearchFetcher>) -> EngineBuilder {
        EngineBuilder::new(fetcher)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.inner.lock().state.clone()
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Option<AggregatedSession> {
        self.inner.lock().session.clone()
    }

    /// All records of the current session.
    #[must_use]
    pub fn records(&self) -> Vec<ResultRecord> {
        self.inner
            .lock()
            .session
            .as_ref()
            .map(|s| s.records().to_vec())
            .unwrap_or_default()
    }

    /// Whether the current session can load another page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.inner
            .lock()
            .session
            .as_ref()
            .is_some_and(AggregatedSession::has_more)
    }

    /// Number of searches started so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Records on the displayed page.
    #[must_use]
    pub fn current_page_records(&self) -> Vec<ResultRecord> {
        self.inner
            .lock()
            .session
            .as_ref()
            .map(|s| s.current_page_records().to_vec())
            .unwrap_or_default()
    }

    /// Moves the display cursor forward. Returns false at the last page.
    pub fn next_page(&self) -> bool {
        self.inner.lock().session.as_mut().is_some_and(AggregatedSession::next_page)
    }

    /// Moves the display cursor back. Returns false at the first page.
    pub fn prev_page(&self) -> bool {
        self.inner.lock().session.as_mut().is_some_and(AggregatedSession::prev_page)
    }

    /// Starts a new search, replacing any current session.
    ///
    /// A live cache entry is used unless `skip_cache` is set; otherwise the
    /// first page is fetched after the rate-limit wait. Records whose id
    /// equals `exclude_id` are dropped.
    pub async fn start_search(
        &self,
        subject: &str,
        exclude_id: Option<&str>,
        skip_cache: bool,
    ) -> SearchOutcome {
        let request = SearchRequest {
            subject: subject.to_string(),
            exclude_id: exclude_id.map(String::from),
        };
        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.state = EngineState::Loading;
            inner.session = None;
            inner.last_request = Some(request.clone());
            inner.generation
        };
        info!(subject, generation, skip_cache, "Starting search");
        self.emit(&PanelUpdate::Loading);

        if !skip_cache {
            if let Some(entry) = self.cache.get(subject) {
                debug!(subject, records = entry.records.len(), "Restoring search from cache");
                let mut session = self.new_session(&request);
                session.merge(entry.records);
                session.set_token(entry.token);
                return self.install_session(generation, session, true);
            }
        }

        self.limiter.acquire(self.clock.as_ref()).await;
        if self.inner.lock().generation != generation {
            debug!(subject, generation, "Search superseded before fetching");
            return SearchOutcome::Superseded;
        }

        match self.fetch_page(subject, None).await {
            Ok((records, token)) => {
                let mut session = self.new_session(&request);
                session.merge(records);
                session.set_token(token);
                self.install_session(generation, session, false)
            }
            Err(failure) => {
                {
                    let mut inner = self.inner.lock();
                    if inner.generation != generation {
                        debug!(subject, generation, "Dropping failure of superseded search");
                        return SearchOutcome::Superseded;
                    }
                    inner.state = EngineState::Error {
                        failure: failure.clone(),
                    };
                    inner.session = None;
                }
                warn!(subject, kind = %failure.kind, error = %failure.message, "Search failed");
                self.emit(&PanelUpdate::from_failure(&failure));
                SearchOutcome::Failed(failure)
            }
        }
    }

    /// Fetches the next page of the current session and appends it.
    ///
    /// On failure the session keeps its records and token.
    pub async fn load_more(&self) -> Result<LoadMoreOutcome, LoadMoreError> {
        let (generation, session_id, subject, token) = {
            let mut inner = self.inner.lock();
            match inner.state {
                EngineState::LoadingMore => return Err(LoadMoreError::InFlight),
                EngineState::Populated => {}
                _ => return Err(LoadMoreError::NotReady),
            }
            let Some(session) = inner.session.as_ref() else {
                return Err(LoadMoreError::NotReady);
            };
            let Some(token) = session.token().cloned() else {
                debug!(subject = session.subject(), "No continuation token; nothing to load");
                return Err(LoadMoreError::NoMoreResults);
            };
            let ticket = (
                inner.generation,
                session.id(),
                session.subject().to_string(),
                token,
            );
            inner.state = EngineState::LoadingMore;
            ticket
        };
        debug!(subject = %subject, token = %token, "Loading more results");
        self.emit(&PanelUpdate::LoadingMore);

        self.limiter.acquire(self.clock.as_ref()).await;
        if !self.inner.lock().owns(generation, session_id) {
            debug!(subject = %subject, "Load superseded before fetching");
            return Err(LoadMoreError::Superseded);
        }

        match self.fetch_page(&subject, Some(&token)).await {
            Ok((records, next)) => {
                let next = next.filter(|n| {
                    if *n == token {
                        warn!(token = %n, "Continuation token did not advance; treating results as exhausted");
                        false
                    } else {
                        true
                    }
                });

                let (outcome, all_records, next_token) = {
                    let mut inner = self.inner.lock();
                    if !inner.owns(generation, session_id) {
                        debug!(subject = %subject, "Dropping page of replaced session");
                        return Err(LoadMoreError::Superseded);
                    }
                    let Some(session) = inner.session.as_mut() else {
                        return Err(LoadMoreError::Superseded);
                    };
                    let added = session.merge(records);
                    session.set_token(next);
                    let outcome = LoadMoreOutcome {
                        added,
                        total: session.len(),
                        has_more: session.has_more(),
                    };
                    let snapshot = (session.records().to_vec(), session.token().cloned());
                    inner.state = EngineState::Populated;
                    (outcome, snapshot.0, snapshot.1)
                };

                info!(
                    subject = %subject,
                    added = outcome.added,
                    total = outcome.total,
                    has_more = outcome.has_more,
                    "Appended result page"
                );
                self.cache.put(&subject, all_records.clone(), next_token);
                self.emit(&PanelUpdate::Populated {
                    records: all_records,
                    has_more: outcome.has_more,
                });
                Ok(outcome)
            }
            Err(failure) => {
                let update = {
                    let mut inner = self.inner.lock();
                    if !inner.owns(generation, session_id) {
                        return Err(LoadMoreError::Superseded);
                    }
                    inner.state = EngineState::Populated;
                    inner.populated_update()
                };
                warn!(subject = %subject, kind = %failure.kind, error = %failure.message, "Load more failed");
                self.emit(&update);
                Err(LoadMoreError::Fetch(failure))
            }
        }
    }

    /// Repeats the last search, bypassing the cache. `None` if no search
    /// was ever started.
    pub async fn retry(&self) -> Option<SearchOutcome> {
        let request = self.inner.lock().last_request.clone()?;
        info!(subject = %request.subject, "Retrying search");
        Some(
            self.start_search(&request.subject, request.exclude_id.as_deref(), true)
                .await,
        )
    }

    fn new_session(&self, request: &SearchRequest) -> AggregatedSession {
        AggregatedSession::new(
            request.subject.clone(),
            request.exclude_id.clone(),
            self.page_size,
        )
    }

    fn install_session(
        &self,
        generation: u64,
        session: AggregatedSession,
        from_cache: bool,
    ) -> SearchOutcome {
        let outcome = SearchOutcome::Populated {
            record_count: session.len(),
            from_cache,
            has_more: session.has_more(),
        };
        let subject = session.subject().to_string();
        let records = session.records().to_vec();
        let token = session.token().cloned();

        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!(subject = %subject, generation, "Dropping result of superseded search");
                return SearchOutcome::Superseded;
            }
            inner.session = Some(session);
            inner.state = EngineState::Populated;
        }

        info!(subject = %subject, records = records.len(), from_cache, "Search populated");
        if !from_cache {
            self.cache.put(&subject, records.clone(), token.clone());
        }
        self.emit(&PanelUpdate::Populated {
            records,
            has_more: token.is_some(),
        });
        outcome
    }

    /// Fetches one page and turns it into records plus the next token.
    async fn fetch_page(
        &self,
        subject: &str,
        token: Option<&PaginationToken>,
    ) -> Result<(Vec<ResultRecord>, Option<PaginationToken>), FetchFailure> {
        let fetched = AssertUnwindSafe(self.fetcher.fetch(subject, token))
            .catch_unwind()
            .await;
        let page = match fetched {
            Ok(result) => result?,
            Err(_) => {
                warn!(subject, "Fetcher panicked");
                return Err(FetchFailure::unknown("fetch aborted unexpectedly"));
            }
        };

        let processed = catch_unwind(AssertUnwindSafe(|| {
            (self.parser.parse(&page.html), self.extractor.extract(&page.html))
        }));
        let Ok((records, extracted)) = processed else {
            warn!(subject, "Result page processing panicked");
            return Err(FetchFailure::unknown("result page could not be processed"));
        };

        let next = extracted.or(page.next_token);
        debug!(subject, records = records.len(), has_more = next.is_some(), "Processed result page");
        Ok((records, next))
    }

    fn emit(&self, update: &PanelUpdate) {
        let observer = &self.observer;
        if catch_unwind(AssertUnwindSafe(|| observer.on_update(update))).is_err() {
            warn!(state = update.state_name(), "Panel observer panicked");
        }
    }
}

/// Builder for [`AggregationEngine`].
pub struct EngineBuilder {
    fetcher: Arc<dyn SearchFetcher>,
    config: NamesakeConfig,
    cache: Option<Arc<dyn CacheStore>>,
    limiter: Option<Arc<RateLimiter>>,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn PanelObserver>>,
    extractor: Option<TokenExtractor>,
}

impl EngineBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new(fetcher: Arc<dyn SearchFetcher>) -> Self {
        Self {
            fetcher,
            config: NamesakeConfig::default(),
            cache: None,
            limiter: None,
            clock: None,
            observer: None,
            extractor: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: NamesakeConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a shared cache store.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Uses a shared rate limiter.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Uses a specific clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sends panel updates to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PanelObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Uses a custom token extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: TokenExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn build(self) -> Result<AggregationEngine, ConfigError> {
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(InMemoryCacheStore::from_config(
                &self.config.cache,
                Arc::clone(&clock),
            ))
        });
        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::from_config(&self.config.pacing)));
        let extractor = self
            .extractor
            .unwrap_or_else(|| TokenExtractor::from_config(&self.config.extraction));

        Ok(AggregationEngine {
            fetcher: self.fetcher,
            cache,
            limiter,
            clock,
            observer: self.observer.unwrap_or_else(|| Arc::new(NoOpPanelObserver)),
            parser: RecordParser::from_config(&self.config.extraction),
            extractor,
            page_size: self.config.panel.page_size,
            inner: Mutex::new(EngineInner::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFetcher;

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = AggregationEngine::builder(Arc::new(ScriptedFetcher::new()))
            .with_config(NamesakeConfig::default().with_page_size(0))
            .build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = AggregationEngine::builder(Arc::new(ScriptedFetcher::new()))
            .build()
            .unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.session().is_none());
        assert!(engine.records().is_empty());
        assert!(!engine.has_more());
        assert!(!engine.next_page());
        assert_eq!(engine.generation(), 0);
    }

    #[tokio::test]
    async fn test_load_more_before_search_is_not_ready() {
        let engine = AggregationEngine::builder(Arc::new(ScriptedFetcher::new()))
            .build()
            .unwrap();
        assert_eq!(engine.load_more().await, Err(LoadMoreError::NotReady));
        assert_eq!(engine.retry().await, None);
    }
}

//! Scripted fetchers for driving the engine in tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::errors::FetchFailure;
use crate::fetch::{FetchedPage, SearchFetcher};
use crate::models::PaginationToken;
use crate::utils::{add_duration, Clock, Timestamp};

/// One recorded fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    /// Subject passed to the fetcher.
    pub subject: String,
    /// Token passed to the fetcher.
    pub token: Option<PaginationToken>,
    /// Clock time of the call, when a clock is attached.
    pub at: Option<Timestamp>,
}

/// A fetcher that replays queued responses in order and records each call.
///
/// Once the queue is empty every call fails with an `unknown` failure.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<FetchedPage, FetchFailure>>>,
    calls: Mutex<Vec<FetchCall>>,
    clock: Option<Arc<dyn Clock>>,
}

impl std::fmt::Debug for ScriptedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedFetcher")
            .field("remaining", &self.responses.lock().len())
            .field("calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}

impl ScriptedFetcher {
    /// Creates a fetcher with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps each recorded call with `clock`'s time.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Queues a successful page.
    #[must_use]
    pub fn with_page(self, html: impl Into<String>) -> Self {
        self.push_page(html);
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn with_failure(self, failure: FetchFailure) -> Self {
        self.push_failure(failure);
        self
    }

    /// Queues a successful page.
    pub fn push_page(&self, html: impl Into<String>) {
        self.responses.lock().push_back(Ok(FetchedPage::new(html)));
    }

    /// Queues a page carrying an advisory token.
    pub fn push_fetched(&self, page: FetchedPage) {
        self.responses.lock().push_back(Ok(page));
    }

    /// Queues a failure.
    pub fn push_failure(&self, failure: FetchFailure) {
        self.responses.lock().push_back(Err(failure));
    }

    /// Returns every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the number of queued responses left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl SearchFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        subject: &str,
        token: Option<&PaginationToken>,
    ) -> Result<FetchedPage, FetchFailure> {
        self.calls.lock().push(FetchCall {
            subject: subject.to_string(),
            token: token.cloned(),
            at: self.clock.as_ref().map(|c| c.now()),
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FetchFailure::unknown("no scripted response left")))
    }
}

/// Wraps a [`ScriptedFetcher`] and holds selected calls until released.
#[derive(Debug, Default)]
pub struct GatedFetcher {
    inner: ScriptedFetcher,
    gate: Notify,
    gated_subjects: Mutex<HashSet<String>>,
    gate_all: bool,
}

impl GatedFetcher {
    /// Wraps `inner`; nothing is gated yet.
    #[must_use]
    pub fn new(inner: ScriptedFetcher) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// Holds every call until released.
    #[must_use]
    pub fn gate_all(mut self) -> Self {
        self.gate_all = true;
        self
    }

    /// Holds calls for `subject` until released.
    #[must_use]
    pub fn gate_subject(self, subject: impl Into<String>) -> Self {
        self.gated_subjects.lock().insert(subject.into());
        self
    }

    /// Lets one held call (or the next gated call) proceed.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// The wrapped fetcher.
    #[must_use]
    pub fn inner(&self) -> &ScriptedFetcher {
        &self.inner
    }
}

#[async_trait]
impl SearchFetcher for GatedFetcher {
    async fn fetch(
        &self,
        subject: &str,
        token: Option<&PaginationToken>,
    ) -> Result<FetchedPage, FetchFailure> {
        let gated = self.gate_all || self.gated_subjects.lock().contains(subject);
        if gated {
            self.gate.notified().await;
        }
        self.inner.fetch(subject, token).await
    }
}

/// A clock that reads wall time off tokio's timer.
///
/// Under `#[tokio::test(start_paused = true)]` time only moves while every
/// task is asleep, so real sleeps and fetch timestamps stay deterministic.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Timestamp,
    started: tokio::time::Instant,
}

impl TokioClock {
    /// Starts the clock at `origin`.
    #[must_use]
    pub fn starting_at(origin: Timestamp) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        add_duration(self.origin, self.started.elapsed())
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

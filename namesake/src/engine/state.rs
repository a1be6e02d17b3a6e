//! Engine lifecycle states and operation outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::FetchFailure;

/// Where the engine is in its search lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    /// No search has been started.
    #[default]
    Idle,
    /// A search is fetching its first page.
    Loading,
    /// A session is available.
    Populated,
    /// A session is available and its next page is being fetched.
    LoadingMore,
    /// The last search failed; no session is held.
    Error {
        /// The failure that ended the search.
        failure: FetchFailure,
    },
}

impl EngineState {
    /// Short state name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Populated => "populated",
            Self::LoadingMore => "loading_more",
            Self::Error { .. } => "error",
        }
    }

    /// Whether a fetch is outstanding.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }

    /// Whether a session can be read.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        matches!(self, Self::Populated | Self::LoadingMore)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of [`crate::engine::AggregationEngine::start_search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The search produced a session.
    Populated {
        /// Records in the new session.
        record_count: usize,
        /// Whether the session was restored from the cache.
        from_cache: bool,
        /// Whether a continuation token is held.
        has_more: bool,
    },
    /// A newer search started before this one resolved; its result was dropped.
    Superseded,
    /// The fetch failed.
    Failed(FetchFailure),
}

impl SearchOutcome {
    /// Whether the search produced a session.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        matches!(self, Self::Populated { .. })
    }
}

/// Result of a successful [`crate::engine::AggregationEngine::load_more`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadMoreOutcome {
    /// Records appended by this page after exclusion and deduplication.
    pub added: usize,
    /// Records in the session afterwards.
    pub total: usize,
    /// Whether another page can be loaded.
    pub has_more: bool,
}

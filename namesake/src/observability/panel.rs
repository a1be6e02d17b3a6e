//! Panel updates and the observers that receive them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Level};

use crate::errors::{ErrorKind, FetchFailure};
use crate::models::ResultRecord;

/// What the presentation layer should show after a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelUpdate {
    /// A search is in progress.
    Loading,
    /// Another page is being appended to the shown results.
    LoadingMore,
    /// Results are available.
    Populated {
        /// Every record in the session.
        records: Vec<ResultRecord>,
        /// Whether a continuation token is held.
        has_more: bool,
    },
    /// The search failed.
    Error {
        /// Failure classification.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
        /// Wait-and-retry hint for rate limits and challenges.
        hint: Option<String>,
    },
}

impl PanelUpdate {
    /// Builds an error update from a fetch failure.
    #[must_use]
    pub fn from_failure(failure: &FetchFailure) -> Self {
        Self::Error {
            kind: failure.kind,
            message: failure.message.clone(),
            hint: failure.kind.retry_hint().map(String::from),
        }
    }

    /// Short state name.
    #[must_use]
    pub const fn state_name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::LoadingMore => "loading_more",
            Self::Populated { .. } => "populated",
            Self::Error { .. } => "error",
        }
    }
}

/// Receives one update per engine state transition.
#[cfg_attr(test, mockall::automock)]
pub trait PanelObserver: Send + Sync {
    /// Called after the engine changes state.
    fn on_update(&self, update: &PanelUpdate);
}

/// Observer that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPanelObserver;

impl PanelObserver for NoOpPanelObserver {
    fn on_update(&self, _update: &PanelUpdate) {}
}

/// Observer that logs updates through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingPanelObserver {
    level: Level,
}

impl Default for LoggingPanelObserver {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingPanelObserver {
    /// Creates an observer logging at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level observer.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl PanelObserver for LoggingPanelObserver {
    fn on_update(&self, update: &PanelUpdate) {
        match update {
            PanelUpdate::Error { kind, message, .. } => {
                warn!(state = update.state_name(), kind = %kind, message = %message, "Panel update");
            }
            PanelUpdate::Populated { records, has_more } if self.level == Level::DEBUG => {
                debug!(state = update.state_name(), records = records.len(), has_more, "Panel update");
            }
            PanelUpdate::Populated { records, has_more } => {
                info!(state = update.state_name(), records = records.len(), has_more, "Panel update");
            }
            _ if self.level == Level::DEBUG => debug!(state = update.state_name(), "Panel update"),
            _ => info!(state = update.state_name(), "Panel update"),
        }
    }
}

/// Observer that keeps every update, for tests.
#[derive(Debug, Default)]
pub struct CollectingPanelObserver {
    updates: parking_lot::RwLock<Vec<PanelUpdate>>,
}

impl CollectingPanelObserver {
    /// Creates an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every update received so far.
    #[must_use]
    pub fn updates(&self) -> Vec<PanelUpdate> {
        self.updates.read().clone()
    }

    /// Returns the state names in arrival order.
    #[must_use]
    pub fn states(&self) -> Vec<&'static str> {
        self.updates.read().iter().map(PanelUpdate::state_name).collect()
    }

    /// Returns the most recent update.
    #[must_use]
    pub fn last(&self) -> Option<PanelUpdate> {
        self.updates.read().last().cloned()
    }

    /// Returns the number of updates received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.read().len()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.read().is_empty()
    }

    /// Forgets collected updates.
    pub fn clear(&self) {
        self.updates.write().clear();
    }
}

impl PanelObserver for CollectingPanelObserver {
    fn on_update(&self, update: &PanelUpdate) {
        self.updates.write().push(update.clone());
    }
}

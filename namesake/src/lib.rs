//! # Namesake
//!
//! Result aggregation and pagination for a same-name author panel.
//!
//! Given an author's display name, the engine fetches the matching author
//! profiles from a scholarly search site, merges pages into one
//! de-duplicated session, and keeps the panel informed as it goes:
//!
//! - **Extraction**: result cards become records; pagination tokens are
//!   recovered from whatever form the page encodes them in
//! - **Pacing**: a shared minimum interval between outgoing fetches
//! - **Caching**: aggregated sessions are reused for five minutes
//! - **Supersession**: a newer search always wins over a slower older one
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use namesake::prelude::*;
//! use std::sync::Arc;
//!
//! let fetcher = Arc::new(HttpSearchFetcher::new(FetchConfig::default())?);
//! let engine = AggregationEngine::builder(fetcher)
//!     .with_observer(Arc::new(LoggingPanelObserver::default()))
//!     .build()?;
//!
//! engine.start_search("Ada Lovelace", Some("qc6CJjYAAAAJ"), false).await;
//! while engine.has_more() {
//!     engine.load_more().await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod extraction;
pub mod fetch;
pub mod models;
pub mod observability;
pub mod pacing;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{normalize_subject, CacheEntry, CacheStore, InMemoryCacheStore};
    pub use crate::config::{
        CacheConfig, ExtractionConfig, FetchConfig, NamesakeConfig, OccurrencePolicy,
        PacingConfig, PanelConfig,
    };
    pub use crate::engine::{
        AggregatedSession, AggregationEngine, EngineBuilder, EngineState, LoadMoreOutcome,
        SearchOutcome,
    };
    pub use crate::errors::{ConfigError, ErrorKind, FetchFailure, LoadMoreError};
    pub use crate::extraction::{
        extract_token, parse_records, RecordParser, TokenExtractor, TokenStrategy,
    };
    #[cfg(feature = "http")]
    pub use crate::fetch::HttpSearchFetcher;
    pub use crate::fetch::{FetchedPage, SearchFetcher};
    pub use crate::models::{PaginationToken, ResultRecord};
    pub use crate::observability::{
        init_tracing, CollectingPanelObserver, LoggingPanelObserver, NoOpPanelObserver,
        PanelObserver, PanelUpdate,
    };
    pub use crate::pacing::RateLimiter;
    pub use crate::utils::{Clock, ManualClock, SystemClock};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

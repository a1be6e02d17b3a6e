//! Search orchestration.
//!
//! This module provides:
//! - The aggregation engine and its builder
//! - The aggregated session with display pagination
//! - Engine states and operation outcomes

mod aggregator;
mod session;
mod state;

pub use aggregator::{AggregationEngine, EngineBuilder};
pub use session::AggregatedSession;
pub use state::{EngineState, LoadMoreOutcome, SearchOutcome};

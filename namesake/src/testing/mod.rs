//! Testing utilities for code that drives the aggregation engine.
//!
//! This module provides:
//! - Scripted and gated fetchers that replay canned responses
//! - A clock that follows tokio's (pausable) timer
//! - Fixture builders for result pages, cards and challenge pages

pub mod fixtures;
mod mocks;

pub use fixtures::{
    author_card, captcha_page, detailed_card, empty_results_page, next_control, numbered_page,
    results_page,
};
pub use mocks::{FetchCall, GatedFetcher, ScriptedFetcher, TokioClock};

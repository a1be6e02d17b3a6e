//! Shared helpers for time handling and text cleanup.

pub mod clock;
mod text;

pub use clock::{
    add_duration, elapsed_between, epoch_ms, from_epoch_ms, Clock, ManualClock, SystemClock,
    Timestamp,
};
pub use text::{collapse_whitespace, resolve_url};

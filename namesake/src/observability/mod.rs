//! Observability utilities.

mod logging;
mod panel;

pub use logging::{init_tracing, DEFAULT_FILTER};
#[cfg(test)]
pub use panel::MockPanelObserver;
pub use panel::{
    CollectingPanelObserver, LoggingPanelObserver, NoOpPanelObserver, PanelObserver, PanelUpdate,
};

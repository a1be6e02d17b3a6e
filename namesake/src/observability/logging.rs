//! Subscriber installation for binaries and tests embedding the engine.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::ConfigError;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "namesake=info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`.
///
/// With `json` set, events are written as one JSON object per line. Fails if
/// a global subscriber is already installed.
pub fn init_tracing(json: bool) -> Result<(), ConfigError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_fails() {
        // Either this call or an earlier one in the same process installed
        // the global subscriber; the next attempt must report it.
        let _ = init_tracing(false);
        let err = init_tracing(true).unwrap_err();
        assert!(matches!(err, ConfigError::Logging(_)));
    }
}

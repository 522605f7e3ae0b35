//! Logging utilities and structured logging support

use std::sync::Once;

use serde::{Deserialize, Serialize};

pub use log::{debug, error, info, trace, warn};

/// Logger configuration
///
/// `filter` follows the `env_logger` filter syntax (e.g. "info",
/// "effect_renderer=trace").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Explicit filter; falls back to `RUST_LOG`, then `info`
    pub filter: Option<String>,
}

static INIT: Once = Once::new();

/// Initialize the logging system
///
/// Subsequent calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        // A host may already own the global logger.
        if builder.try_init().is_err() {
            log::debug!("global logger already installed, keeping it");
            return;
        }

        log::debug!("logging initialized");
    });
}

/// Initialize the logging system with `RUST_LOG` / `info` defaults
pub fn init() {
    init_logging(&LoggingConfig::default());
}

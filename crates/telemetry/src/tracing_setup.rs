//! Tracing setup for structured logging.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// `[logging]` section of the collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level or filter directive (e.g., "info", "worker=debug").
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,
    /// JSON output; `LOG_JSON=1` forces it on.
    #[serde(default)]
    pub json: bool,
    /// Log span open/close events
    #[serde(default)]
    pub span_events: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            span_events: false,
        }
    }
}

impl LoggingConfig {
    /// Filter directive after applying `RUST_LOG`.
    pub fn effective_filter(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.level.to_lowercase())
    }

    /// JSON flag after applying `LOG_JSON`.
    pub fn effective_json(&self) -> bool {
        std::env::var("LOG_JSON")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(self.json)
    }
}

/// Install the global subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = config.effective_filter();
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.effective_json() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_span_events(span_events).with_target(true))
            .init();
    }

    tracing::info!(filter = %filter, "Tracing initialized");
}

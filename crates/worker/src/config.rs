//! Poll loop configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// `[general]` section of the collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PollConfig {
    /// Seconds to sleep between polling cycles
    #[serde(default = "default_delay_secs")]
    #[validate(range(min = 1, message = "delay must be at least one second"))]
    pub delay_secs: u64,
    /// Emit the cross-host `active_streams` point
    #[serde(default = "default_report_combined")]
    pub report_combined: bool,
    /// Seconds between library and recently-added reports
    #[serde(default = "default_library_interval_secs")]
    pub library_interval_secs: u64,
    /// Run one cycle and exit
    #[serde(default)]
    pub single_run: bool,
}

fn default_delay_secs() -> u64 {
    2
}

fn default_report_combined() -> bool {
    true
}

fn default_library_interval_secs() -> u64 {
    300
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            report_combined: default_report_combined(),
            library_interval_secs: default_library_interval_secs(),
            single_run: false,
        }
    }
}

impl PollConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn library_interval(&self) -> Duration {
        Duration::from_secs(self.library_interval_secs)
    }
}

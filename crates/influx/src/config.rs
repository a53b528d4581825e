//! InfluxDB configuration.

use serde::{Deserialize, Serialize};

/// InfluxDB 1.x connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Host name or IP address
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name; created on first write if missing
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_address() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_database() -> String {
    "plex_data".to_string()
}

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            database: default_database(),
            ssl: false,
            verify_ssl: default_verify_ssl(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl InfluxConfig {
    /// Base URL of the HTTP API.
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.address, self.port)
    }

    /// `u`/`p` query parameters, empty when no username is set.
    pub fn credentials(&self) -> Vec<(&'static str, &str)> {
        if self.username.is_empty() {
            Vec::new()
        } else {
            vec![("u", self.username.as_str()), ("p", self.password.as_str())]
        }
    }
}
